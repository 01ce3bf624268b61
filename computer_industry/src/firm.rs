//! Firm agents: R&D, innovation, market entry, adoption, accounting, exit.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::params::{IndustryParams, UserClassParams};
use crate::rng::JavaRandom;
use crate::technology::Technology;
use crate::Generation;

/// One computer producer.
///
/// A firm is created by the industry at a generation-entry event (or by
/// diversification), mutated every period by the phase methods below, and
/// flagged dead by its own exit rule. Dead firms keep their slot; the
/// record is never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firm {
    pub id: usize,
    pub birth_period: u32,
    pub generation: Generation,
    pub alive: bool,
    /// Set once, when the product first clears a segment's entry
    /// thresholds; the firm is bound to that segment for life.
    pub entered: bool,
    /// True after the firm switches to the newer technology.
    pub adopted: bool,
    /// True after the firm has spawned a diversified division.
    pub mother: bool,
    /// Index into the industry technology table.
    pub tech: usize,
    /// Index of the demand segment this firm sells to.
    pub served_class: Option<usize>,

    pub budget: f64,
    pub debt: f64,
    pub init_budget: f64,

    /// Cheapness of the product (higher is cheaper).
    pub cheap: f64,
    /// Performance of the product.
    pub perf: f64,
    /// Fraction of R&D resources allocated to cheapness, fixed at birth.
    pub cheap_mix: f64,
    pub perf_mix: f64,
    /// R&D draws bought this period on the cheapness dimension.
    pub cheap_rd_input: i32,
    pub perf_rd_input: i32,
    /// Accumulated innovation experience on the current technology.
    pub experience: f64,

    pub mkting_capab: f64,
    pub adv_expend: f64,

    /// Perceived design merit of the product (Eq. 8).
    pub merit: f64,
    /// Propensity to sell (Eq. 9).
    pub propensity: f64,
    pub share: f64,
    pub units_sold: f64,
    pub price: f64,
    pub production_cost: f64,
    pub profit: f64,

    /// Net worth normalized by the compounded initial budget.
    pub norm_net_worth: f64,
    /// EWMA of the change in normalized net worth.
    pub exit_indicator: f64,
}

impl Firm {
    /// Regular entrant (first or a later scheduled generation).
    ///
    /// Two draws, in this order: initial budget, then the cheapness share
    /// of the R&D mix.
    pub fn new(
        id: usize,
        birth_period: u32,
        generation: Generation,
        tech: usize,
        tec: &Technology,
        rng: &mut JavaRandom,
    ) -> Self {
        let init_budget = tec.min_init_budget + rng.next_double() * tec.init_budget_range;
        let cheap_mix = rng.next_double();
        Firm {
            id,
            birth_period,
            generation,
            alive: true,
            entered: false,
            adopted: false,
            mother: false,
            tech,
            served_class: None,
            budget: init_budget,
            debt: init_budget,
            init_budget,
            cheap: 0.0,
            perf: 0.0,
            cheap_mix,
            perf_mix: 1.0 - cheap_mix,
            cheap_rd_input: 0,
            perf_rd_input: 0,
            experience: 0.0,
            mkting_capab: 0.0,
            adv_expend: 0.0,
            merit: 0.0,
            propensity: 0.0,
            share: 0.0,
            units_sold: 0.0,
            price: 0.0,
            production_cost: 0.0,
            profit: 0.0,
            norm_net_worth: 0.0,
            exit_indicator: 0.0,
        }
    }

    /// Diversified division spun off an incumbent.
    ///
    /// Endowment and marketing capability are inherited from the mother;
    /// the product starts at the target segment's current mean levels, the
    /// division carries no debt and is already bound to the segment. One
    /// draw: the R&D mix.
    #[allow(clippy::too_many_arguments)]
    pub fn spin_off(
        id: usize,
        birth_period: u32,
        tech: usize,
        init_budget: f64,
        mkting_capab: f64,
        served_class: usize,
        start_cheap: f64,
        start_perf: f64,
        rng: &mut JavaRandom,
    ) -> Self {
        let cheap_mix = rng.next_double();
        Firm {
            id,
            birth_period,
            generation: Generation::Diversified,
            alive: true,
            entered: true,
            adopted: false,
            mother: false,
            tech,
            served_class: Some(served_class),
            budget: init_budget,
            debt: 0.0,
            init_budget,
            cheap: start_cheap,
            perf: start_perf,
            cheap_mix,
            perf_mix: 1.0 - cheap_mix,
            cheap_rd_input: 0,
            perf_rd_input: 0,
            experience: 0.0,
            mkting_capab,
            adv_expend: 0.0,
            merit: 0.0,
            propensity: 0.0,
            share: 0.0,
            units_sold: 0.0,
            price: 0.0,
            production_cost: 0.0,
            profit: 0.0,
            norm_net_worth: 0.0,
            exit_indicator: 0.0,
        }
    }

    fn age(&self, time: u32) -> u32 {
        time - self.birth_period
    }

    /// R&D spending rule, four mutually exclusive cases.
    ///
    /// Exits immediately when the spend exhausts the budget or the total
    /// draw count falls below one.
    pub fn rd_investment(&mut self, time: u32, p: &IndustryParams, rng: &mut JavaRandom) {
        debug_assert!(self.alive, "rd_investment on a dead firm");
        let ante_rd = self.cheap_rd_input + self.perf_rd_input;
        let profit_share = self.profit * (1.0 - p.phi_debt) * p.phi_rd;

        if self.generation != Generation::Diversified && self.age(time) < p.project_time {
            // Startup still drawing down its initial project budget.
            let pool = self.init_budget / p.project_time as f64 + profit_share;
            self.cheap_rd_input = ((pool * self.cheap_mix) / p.rd_cost).floor() as i32;
            self.perf_rd_input = ((pool * self.perf_mix) / p.rd_cost).floor() as i32;
        } else if self.generation == Generation::Diversified && self.age(time) < p.proj_time_div {
            // Diversified division in its shorter project window.
            let pool =
                self.init_budget * p.phi_b_div / p.proj_time_div as f64 + profit_share;
            self.cheap_rd_input = ((pool * self.cheap_mix) / p.rd_cost).floor() as i32;
            self.perf_rd_input = ((pool * self.perf_mix) / p.rd_cost).floor() as i32;
        } else if profit_share < ante_rd as f64 * p.rd_cost {
            // Profit cannot sustain last period's spend: shrink both inputs
            // by a random factor in [min, min + bias].
            let shrink = p.phi_rd_tild_min + rng.next_double() * p.phi_rd_tild_bias;
            self.cheap_rd_input = (self.cheap_rd_input as f64 * shrink).floor() as i32;
            self.perf_rd_input = (self.perf_rd_input as f64 * shrink).floor() as i32;
        } else {
            // Steady state: a fixed fraction of post-debt-service profit.
            self.cheap_rd_input = ((profit_share * self.cheap_mix) / p.rd_cost).floor() as i32;
            self.perf_rd_input = ((profit_share * self.perf_mix) / p.rd_cost).floor() as i32;
        }

        self.budget -= (self.cheap_rd_input + self.perf_rd_input) as f64 * p.rd_cost;
        if self.budget <= 0.0 || self.cheap_rd_input + self.perf_rd_input < 1 {
            self.exit();
        }
    }

    /// Advertising spend and its power-law effect on marketing capability
    /// (Eqs. 6 and 7).
    pub fn adv_expenditure(&mut self, p: &IndustryParams) {
        debug_assert!(self.alive, "adv_expenditure on a dead firm");
        self.adv_expend = p.phi_adv * self.profit * (1.0 - p.phi_debt);
        self.mkting_capab += p.adv0 * self.adv_expend.powf(p.adv1);
        self.budget -= self.adv_expend;
        if self.budget <= 0.0 {
            self.exit();
        }
    }

    /// Perceived merit (Eq. 8) and propensity to sell (Eq. 9) for the
    /// served segment, given this period's perception error draw.
    ///
    /// Merit is zero whenever either quality margin is non-positive; the
    /// floors on share and marketing capability keep the propensity's
    /// power terms off non-positive bases.
    pub fn calc_merit(&mut self, class: &UserClassParams, perc_error: f64) {
        debug_assert!(self.alive, "calc_merit on a dead firm");
        let cheap_margin = self.cheap - class.lambda_cheap;
        let perf_margin = self.perf - class.lambda_perf;
        self.merit = if cheap_margin <= 0.0 || perf_margin <= 0.0 {
            0.0
        } else {
            class.gamma_mod
                * cheap_margin.powf(class.gamma_cheap)
                * perf_margin.powf(class.gamma_perf)
        };
        self.propensity = self.merit.powf(class.delta_mod)
            * class.lambda_share.max(self.share).powf(class.delta_share)
            * class.lambda_a.max(self.mkting_capab).powf(class.delta_a)
            * perc_error;
    }

    /// Market share as the firm's fraction of total propensity (Eq. 10);
    /// zero when no serving firm has positive propensity.
    pub fn calc_share(&mut self, sum_propensity: f64) {
        self.share = if sum_propensity != 0.0 {
            self.propensity / sum_propensity
        } else {
            0.0
        };
    }

    /// Sales, price, cost and profit for this period's assigned buyers
    /// (Eqs. 11, 2, 3, 4). Profit is credited to the budget.
    pub fn record_sales(&mut self, buyers_assigned: f64, p: &IndustryParams) {
        debug_assert!(self.alive, "record_sales on a dead firm");
        self.units_sold = self.merit * buyers_assigned;
        self.price = if self.cheap > 0.0 {
            p.nu / self.cheap
        } else {
            0.0
        };
        self.production_cost = self.price / (1.0 + p.mark_up);
        self.profit = self.production_cost * p.mark_up * self.units_sold;
        self.budget += self.profit;
    }

    /// Once-only entry check against one segment's quality thresholds.
    pub fn check_entry(&mut self, class_index: usize, class: &UserClassParams) {
        if !self.entered && self.cheap > class.lambda_cheap && self.perf > class.lambda_perf {
            self.entered = true;
            self.served_class = Some(class_index);
            debug!(
                "firm {} enters segment {:?} (cheap {:.1}, perf {:.1})",
                self.id, class.label, self.cheap, self.perf
            );
        }
    }

    /// Probabilistic switch to a newer technology (Eqs. 12 and 13).
    ///
    /// The probability weighs the firm's proximity to its current frontier
    /// corner against the best progress any firm has made on the new
    /// technology. On success the firm pays a proportional-plus-fixed cost
    /// (only if it can afford it) and retains a random fraction of its
    /// experience.
    pub fn adoption(
        &mut self,
        current: &Technology,
        best_new_progress: f64,
        new_tech: usize,
        p: &IndustryParams,
        rng: &mut JavaRandom,
    ) {
        debug_assert!(self.alive, "adoption on a dead firm");
        let probability = (0.5 * self.distance_from_corner(current).powf(p.alpha_tr)
            + 0.5 * best_new_progress.powf(p.alpha_mp))
        .powf(p.alpha_ado);
        if rng.next_double() < probability {
            let budget_after = self.budget * (1.0 - p.phi_ado) - p.fixed_ado;
            if budget_after > 0.0 {
                self.budget = budget_after;
                self.tech = new_tech;
                self.adopted = true;
                let retained =
                    (p.phi_exp_min + rng.next_double() * p.phi_exp_bias) * self.experience;
                if retained < self.experience {
                    self.experience = retained;
                }
                debug!("firm {} adopts technology {}", self.id, new_tech);
            }
        }
    }

    /// Normalized proximity to the current technology's frontier corner:
    /// 0 at the origin, 1 at the corner.
    pub fn distance_from_corner(&self, tec: &Technology) -> f64 {
        let dc = tec.cheap_limit - self.cheap;
        let dp = tec.perf_limit - self.perf;
        1.0 - (dc * dc + dp * dp).sqrt() / tec.diagonal
    }

    /// Distance covered from the origin, normalized by the frontier
    /// diagonal.
    pub fn distance_covered(&self, tec: &Technology) -> f64 {
        (self.cheap * self.cheap + self.perf * self.perf).sqrt() / tec.diagonal
    }

    /// Stochastic technical change on both product dimensions (Eq. 1).
    ///
    /// The two Gaussian deviates come from one paired polar-method round;
    /// no other draw may be interleaved between them, or identically
    /// seeded trajectories diverge. Each increment is concave in the
    /// remaining distance to the frontier, floored at zero, and the
    /// resulting level is clamped to the frontier.
    pub fn innovation(&mut self, tec: &Technology, p: &IndustryParams, rng: &mut JavaRandom) {
        debug_assert!(self.alive, "innovation on a dead firm");
        let random_cheap = p.mu_inn + rng.next_gaussian() * p.sigma_inn;
        let random_perf = p.mu_inn + rng.next_gaussian() * p.sigma_inn;

        let perf_step = p.beta_perf
            * (tec.perf_limit - self.perf).powf(p.beta_lim)
            * (self.perf_rd_input as f64).powf(p.beta_res)
            * self.experience.powf(p.beta_exp)
            * random_perf;
        if perf_step > 0.0 {
            self.perf += perf_step;
        }
        if self.perf > tec.perf_limit {
            self.perf = tec.perf_limit;
        }

        let cheap_step = p.beta_cheap
            * (tec.cheap_limit - self.cheap).powf(p.beta_lim)
            * (self.cheap_rd_input as f64).powf(p.beta_res)
            * self.experience.powf(p.beta_exp)
            * random_cheap;
        if cheap_step > 0.0 {
            self.cheap += cheap_step;
        }
        if self.cheap > tec.cheap_limit {
            self.cheap = tec.cheap_limit;
        }

        self.experience += 1.0;
    }

    /// Debt service, interest accrual and the exit decision (Eq. 5).
    ///
    /// Debt is repaid out of profit only after the initial project window
    /// and only in profitable periods. The exit indicator smooths the
    /// change in normalized net worth; an entered firm with negative net
    /// worth and a deeply negative indicator leaves the industry.
    pub fn accounting(&mut self, time: u32, p: &IndustryParams) {
        debug_assert!(self.alive, "accounting on a dead firm");
        if self.debt > 0.0 {
            if self.profit > 0.0 && self.age(time) > p.project_time {
                let repayment = self.profit * p.phi_debt;
                self.debt -= repayment;
                self.budget -= repayment;
                if self.debt < 0.0 {
                    self.budget -= self.debt;
                    self.debt = 0.0;
                }
            }
            self.debt *= 1.0 + p.interest_rate;
        }
        self.budget *= 1.0 + p.interest_rate;

        let past = self.norm_net_worth;
        self.norm_net_worth = (self.budget - self.debt)
            / (self.init_budget * (1.0 + p.interest_rate).powi(self.age(time) as i32));
        let change = self.norm_net_worth - past;
        self.exit_indicator =
            self.exit_indicator * (1.0 - p.weight_exit) + change * p.weight_exit;

        if self.entered && self.norm_net_worth < 0.0 && self.exit_indicator < p.exit_threshold {
            self.exit();
        }
    }

    /// Mother-side bookkeeping of a diversification event: the transferred
    /// budget fraction leaves, and the firm never diversifies again.
    pub fn diversify(&mut self, p: &IndustryParams) {
        debug_assert!(self.alive, "diversify on a dead firm");
        self.budget *= 1.0 - p.phi_div;
        self.mother = true;
    }

    /// Terminal, idempotent exit: the firm stays in its slot with identity
    /// fields intact, all flow variables and product attributes zeroed.
    pub fn exit(&mut self) {
        if self.alive {
            debug!("firm {} exits (debt {:.1})", self.id, self.debt);
        }
        self.alive = false;
        self.debt -= self.budget;
        self.budget = 0.0;
        self.share = 0.0;
        self.merit = 0.0;
        self.propensity = 0.0;
        self.cheap = 0.0;
        self.perf = 0.0;
        self.price = 0.0;
        self.production_cost = 0.0;
        self.profit = 0.0;
        self.units_sold = 0.0;
        self.adv_expend = 0.0;
    }
}
