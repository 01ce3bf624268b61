//! Resolved numeric parameter sets.
//!
//! The engine consumes parameters that have already been parsed and
//! type-converted by the caller; nothing in here reads files. `validate()`
//! is the single gate a driver must pass before constructing a model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::technology::Technology;

/// Parameter validation failure, raised before a run starts.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("simulation horizon must be at least 1 period")]
    ZeroHorizon,
    #[error("at least one technology is required")]
    NoTechnologies,
    #[error("at least one user class is required")]
    NoUserClasses,
    #[error("technology {label:?}: {field} must be positive, got {value}")]
    NonPositiveFrontier {
        label: String,
        field: &'static str,
        value: f64,
    },
    #[error("technology {label:?} spawns no entrants")]
    NoEntrants { label: String },
    #[error("industry parameter {field} must be positive, got {value}")]
    NonPositiveIndustryParam { field: &'static str, value: f64 },
    #[error("user class {label:?}: {field} must be positive, got {value}")]
    NonPositiveClassParam {
        label: String,
        field: &'static str,
        value: f64,
    },
    #[error("user class {label:?} has an empty buyer pool")]
    EmptyBuyerPool { label: String },
    #[error("{event} references technology index {index} out of range")]
    TechnologyIndexOutOfRange { event: &'static str, index: usize },
    #[error("diversification rule references user class index {index} out of range")]
    ClassIndexOutOfRange { index: usize },
    #[error("diversification source and target classes must differ")]
    DiversificationSelfTarget,
}

/// Supply-side constants shared by every firm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryParams {
    /// Periods over which the initial project budget is spent.
    pub project_time: u32,
    /// Project window for diversified entrants.
    pub proj_time_div: u32,
    /// Unit cost of one R&D draw.
    pub rd_cost: f64,
    /// Fraction of post-debt-service profit spent on R&D.
    pub phi_rd: f64,
    /// Fraction of post-debt-service profit spent on advertising.
    pub phi_adv: f64,
    /// Fraction of profit allocated to debt repayment.
    pub phi_debt: f64,
    /// Fraction of the mother's budget transferred to a spin-off.
    pub phi_div: f64,
    /// Spillover of marketing capability to a spin-off.
    pub psi_div: f64,
    /// Fraction of a spin-off's endowment spent per project period.
    pub phi_b_div: f64,
    /// Scale of the marketing capability response to ad spend.
    pub adv0: f64,
    /// Exponent of the marketing capability response to ad spend.
    pub adv1: f64,
    /// Weight of frontier proximity in the adoption probability.
    pub alpha_tr: f64,
    /// Weight of the new technology's best progress in the adoption
    /// probability.
    pub alpha_mp: f64,
    /// Adoption difficulty exponent.
    pub alpha_ado: f64,
    /// Proportional cost of adopting the new technology.
    pub phi_ado: f64,
    /// Fixed cost of adopting the new technology.
    pub fixed_ado: f64,
    /// Minimum fraction of experience retained on adoption.
    pub phi_exp_min: f64,
    /// Width of the experience retention draw interval.
    pub phi_exp_bias: f64,
    /// Minimum R&D shrink factor when profit cannot sustain last period's
    /// spend.
    pub phi_rd_tild_min: f64,
    /// Width of the R&D shrink draw interval.
    pub phi_rd_tild_bias: f64,
    /// Markup over production cost.
    pub mark_up: f64,
    /// Proportionality factor mapping cheapness to price.
    pub nu: f64,
    /// Mean of the innovation disturbance.
    pub mu_inn: f64,
    /// Standard deviation of the innovation disturbance.
    pub sigma_inn: f64,
    /// Scale of technical change along the cheapness axis.
    pub beta_cheap: f64,
    /// Scale of technical change along the performance axis.
    pub beta_perf: f64,
    /// Exponent on the distance to the frontier.
    pub beta_lim: f64,
    /// Exponent on R&D resources.
    pub beta_res: f64,
    /// Exponent on accumulated experience.
    pub beta_exp: f64,
    /// Per-period interest rate on budget and debt.
    pub interest_rate: f64,
    /// EWMA weight of the current net-worth change in the exit indicator.
    pub weight_exit: f64,
    /// Exit indicator threshold below which an entered firm quits.
    pub exit_threshold: f64,
}

impl Default for IndustryParams {
    fn default() -> Self {
        IndustryParams {
            project_time: 8,
            proj_time_div: 4,
            rd_cost: 1.0,
            phi_rd: 0.15,
            phi_adv: 0.05,
            phi_debt: 0.4,
            phi_div: 0.25,
            psi_div: 0.5,
            phi_b_div: 0.6,
            adv0: 0.2,
            adv1: 0.5,
            alpha_tr: 2.0,
            alpha_mp: 1.0,
            alpha_ado: 2.0,
            phi_ado: 0.3,
            fixed_ado: 50.0,
            phi_exp_min: 0.3,
            phi_exp_bias: 0.4,
            phi_rd_tild_min: 0.9,
            phi_rd_tild_bias: 0.1,
            mark_up: 0.2,
            nu: 2.5,
            mu_inn: 1.0,
            sigma_inn: 0.25,
            beta_cheap: 0.01,
            beta_perf: 0.01,
            beta_lim: 1.0,
            beta_res: 0.4,
            beta_exp: 0.2,
            interest_rate: 0.01,
            weight_exit: 0.3,
            exit_threshold: -0.05,
        }
    }
}

/// Demand-side constants of one buyer segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClassParams {
    pub label: String,
    /// Scale of the perceived merit (Eq. 8).
    pub gamma_mod: f64,
    /// Exponent of the cheapness margin in perceived merit.
    pub gamma_cheap: f64,
    /// Exponent of the performance margin in perceived merit.
    pub gamma_perf: f64,
    /// Minimum cheapness a product must strictly exceed to serve this
    /// segment.
    pub lambda_cheap: f64,
    /// Minimum performance a product must strictly exceed.
    pub lambda_perf: f64,
    /// Exponent of merit in the propensity to sell (Eq. 9).
    pub delta_mod: f64,
    /// Exponent of the bandwagon (market share) term.
    pub delta_share: f64,
    /// Exponent of the brand image (marketing capability) term.
    pub delta_a: f64,
    /// Floor on the market share entering the propensity.
    pub lambda_share: f64,
    /// Floor on the marketing capability entering the propensity.
    pub lambda_a: f64,
    /// Minimum of the multiplicative perception error.
    pub min_prop_error: f64,
    /// Width of the perception error draw interval.
    pub range_prop_error: f64,
    /// Size of the potential buyer pool.
    pub num_buyers: usize,
    /// Periods over which pool entry eligibility is staggered.
    pub entry_ramp: u32,
    /// Periods a purchased machine stays in service.
    pub service_life: u32,
    /// Width of the randomized re-entry delay after a machine is retired
    /// (draws land in `[1, reentry_spread]`).
    pub reentry_spread: i32,
}

/// Scheduled entry of a later firm cohort on a superior technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationEntry {
    /// Period at which the cohort is created.
    pub period: u32,
    /// Technology the cohort is born on.
    pub tech: usize,
}

/// Window from which incumbents may adopt a newer technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdoptionWindow {
    /// Adoption checks run strictly after this period.
    pub after: u32,
    /// Technology being adopted.
    pub tech: usize,
}

/// Trigger and wiring of incumbent diversification into a second segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiversificationRule {
    /// Segment whose incumbents may diversify.
    pub source_class: usize,
    /// Segment the spin-offs are created to serve.
    pub target_class: usize,
    /// Technology a firm must use to qualify, and the spin-off's
    /// technology.
    pub tech: usize,
    /// Spin-offs are created only while `target_size / source_size`
    /// exceeds this awareness threshold.
    pub aware_threshold: f64,
}

/// Complete resolved configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    /// Number of simulated periods.
    pub horizon: u32,
    pub industry: IndustryParams,
    /// Technology table; firms hold indices into it. Index 0 is the
    /// technology first-generation firms are born on.
    pub technologies: Vec<Technology>,
    /// Demand segments, visited in this order every period.
    pub user_classes: Vec<UserClassParams>,
    pub second_generation: Option<GenerationEntry>,
    pub adoption: Option<AdoptionWindow>,
    pub diversification: Option<DiversificationRule>,
}

impl SimParams {
    /// Baseline two-technology, two-segment computer industry calibration:
    /// transistor-era mainframe producers serving large organizations,
    /// a microprocessor cohort entering later, adoption and
    /// diversification into the small-user segment enabled.
    pub fn computer_industry() -> Self {
        SimParams {
            horizon: 150,
            industry: IndustryParams::default(),
            technologies: vec![
                Technology::new("transistor", 1000.0, 1000.0, 2500.0, 2500.0, 20),
                Technology::new("microprocessor", 10000.0, 6000.0, 4000.0, 4000.0, 20),
            ],
            user_classes: vec![
                UserClassParams {
                    label: "large organizations".to_string(),
                    gamma_mod: 1.0,
                    gamma_cheap: 0.2,
                    gamma_perf: 0.8,
                    lambda_cheap: 200.0,
                    lambda_perf: 500.0,
                    delta_mod: 1.0,
                    delta_share: 0.4,
                    delta_a: 0.3,
                    lambda_share: 0.01,
                    lambda_a: 0.1,
                    min_prop_error: 0.9,
                    range_prop_error: 0.2,
                    num_buyers: 3000,
                    entry_ramp: 30,
                    service_life: 8,
                    reentry_spread: 4,
                },
                UserClassParams {
                    label: "small users".to_string(),
                    gamma_mod: 1.0,
                    gamma_cheap: 0.8,
                    gamma_perf: 0.2,
                    lambda_cheap: 2500.0,
                    lambda_perf: 1000.0,
                    delta_mod: 1.0,
                    delta_share: 0.4,
                    delta_a: 0.3,
                    lambda_share: 0.01,
                    lambda_a: 0.1,
                    min_prop_error: 0.9,
                    range_prop_error: 0.2,
                    num_buyers: 9000,
                    entry_ramp: 40,
                    service_life: 6,
                    reentry_spread: 3,
                },
            ],
            second_generation: Some(GenerationEntry { period: 60, tech: 1 }),
            adoption: Some(AdoptionWindow { after: 80, tech: 1 }),
            diversification: Some(DiversificationRule {
                source_class: 0,
                target_class: 1,
                tech: 1,
                aware_threshold: 0.5,
            }),
        }
    }

    /// Single-technology, single-segment configuration used for focused
    /// experiments: no later cohort, no adoption, no diversification.
    pub fn single_segment(num_firms: usize, horizon: u32) -> Self {
        SimParams {
            horizon,
            industry: IndustryParams::default(),
            technologies: vec![Technology::new(
                "transistor",
                1000.0,
                1000.0,
                2500.0,
                2500.0,
                num_firms,
            )],
            user_classes: vec![UserClassParams {
                label: "large organizations".to_string(),
                gamma_mod: 1.0,
                gamma_cheap: 0.2,
                gamma_perf: 0.8,
                lambda_cheap: 200.0,
                lambda_perf: 500.0,
                delta_mod: 1.0,
                delta_share: 0.4,
                delta_a: 0.3,
                lambda_share: 0.01,
                lambda_a: 0.1,
                min_prop_error: 0.9,
                range_prop_error: 0.2,
                num_buyers: 3000,
                entry_ramp: 30,
                service_life: 8,
                reentry_spread: 4,
            }],
            second_generation: None,
            adoption: None,
            diversification: None,
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.horizon == 0 {
            return Err(ParamsError::ZeroHorizon);
        }
        if self.technologies.is_empty() {
            return Err(ParamsError::NoTechnologies);
        }
        if self.user_classes.is_empty() {
            return Err(ParamsError::NoUserClasses);
        }
        for tec in &self.technologies {
            for (field, value) in [
                ("cheap_limit", tec.cheap_limit),
                ("perf_limit", tec.perf_limit),
                ("min_init_budget", tec.min_init_budget),
            ] {
                if value <= 0.0 {
                    return Err(ParamsError::NonPositiveFrontier {
                        label: tec.label.clone(),
                        field,
                        value,
                    });
                }
            }
            if tec.num_entrants == 0 {
                return Err(ParamsError::NoEntrants {
                    label: tec.label.clone(),
                });
            }
        }
        let ind = &self.industry;
        for (field, value) in [
            ("project_time", ind.project_time as f64),
            ("proj_time_div", ind.proj_time_div as f64),
            ("rd_cost", ind.rd_cost),
            ("mark_up", ind.mark_up),
            ("nu", ind.nu),
            ("sigma_inn", ind.sigma_inn),
            ("weight_exit", ind.weight_exit),
        ] {
            if value <= 0.0 {
                return Err(ParamsError::NonPositiveIndustryParam { field, value });
            }
        }
        for class in &self.user_classes {
            for (field, value) in [
                ("gamma_mod", class.gamma_mod),
                ("lambda_cheap", class.lambda_cheap),
                ("lambda_perf", class.lambda_perf),
                ("lambda_share", class.lambda_share),
                ("lambda_a", class.lambda_a),
                ("min_prop_error", class.min_prop_error),
                ("service_life", class.service_life as f64),
                ("reentry_spread", class.reentry_spread as f64),
            ] {
                if value <= 0.0 {
                    return Err(ParamsError::NonPositiveClassParam {
                        label: class.label.clone(),
                        field,
                        value,
                    });
                }
            }
            if class.num_buyers == 0 {
                return Err(ParamsError::EmptyBuyerPool {
                    label: class.label.clone(),
                });
            }
        }
        if let Some(entry) = self.second_generation {
            if entry.tech >= self.technologies.len() {
                return Err(ParamsError::TechnologyIndexOutOfRange {
                    event: "second generation entry",
                    index: entry.tech,
                });
            }
        }
        if let Some(window) = self.adoption {
            if window.tech >= self.technologies.len() {
                return Err(ParamsError::TechnologyIndexOutOfRange {
                    event: "adoption window",
                    index: window.tech,
                });
            }
        }
        if let Some(rule) = self.diversification {
            if rule.tech >= self.technologies.len() {
                return Err(ParamsError::TechnologyIndexOutOfRange {
                    event: "diversification rule",
                    index: rule.tech,
                });
            }
            for index in [rule.source_class, rule.target_class] {
                if index >= self.user_classes.len() {
                    return Err(ParamsError::ClassIndexOutOfRange { index });
                }
            }
            if rule.source_class == rule.target_class {
                return Err(ParamsError::DiversificationSelfTarget);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_calibration_validates() {
        assert_eq!(SimParams::computer_industry().validate(), Ok(()));
        assert_eq!(SimParams::single_segment(5, 50).validate(), Ok(()));
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let mut params = SimParams::single_segment(5, 50);
        params.horizon = 0;
        assert_eq!(params.validate(), Err(ParamsError::ZeroHorizon));
    }

    #[test]
    fn non_positive_frontier_is_rejected() {
        let mut params = SimParams::single_segment(5, 50);
        params.technologies[0].cheap_limit = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::NonPositiveFrontier {
                field: "cheap_limit",
                ..
            })
        ));
    }

    #[test]
    fn scheduled_events_must_reference_known_technologies() {
        let mut params = SimParams::single_segment(5, 50);
        params.second_generation = Some(GenerationEntry { period: 10, tech: 3 });
        assert!(matches!(
            params.validate(),
            Err(ParamsError::TechnologyIndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn diversification_cannot_target_its_own_segment() {
        let mut params = SimParams::computer_industry();
        params.diversification = Some(DiversificationRule {
            source_class: 1,
            target_class: 1,
            tech: 1,
            aware_threshold: 0.5,
        });
        assert_eq!(
            params.validate(),
            Err(ParamsError::DiversificationSelfTarget)
        );
    }

    #[test]
    fn empty_buyer_pool_is_rejected() {
        let mut params = SimParams::single_segment(5, 50);
        params.user_classes[0].num_buyers = 0;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::EmptyBuyerPool { .. })
        ));
    }
}
