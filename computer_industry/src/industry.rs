//! Supply side: the firm population and the per-phase triggers.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::firm::Firm;
use crate::params::{DiversificationRule, IndustryParams};
use crate::rng::JavaRandom;
use crate::technology::Technology;
use crate::Generation;

/// The firm population plus everything firms share: the technology table
/// and the supply-side constants.
///
/// Firm indices are stable for the whole run; exits flag a firm dead in
/// place and entry events only append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Industry {
    pub params: IndustryParams,
    pub technologies: Vec<Technology>,
    pub firms: Vec<Firm>,
}

impl Industry {
    /// Spawn the first-generation cohort on technology 0.
    pub fn new(
        params: IndustryParams,
        technologies: Vec<Technology>,
        rng: &mut JavaRandom,
    ) -> Self {
        let first = &technologies[0];
        let firms = (0..first.num_entrants)
            .map(|id| Firm::new(id, 1, Generation::First, 0, first, rng))
            .collect();
        Industry {
            params,
            technologies,
            firms,
        }
    }

    /// Scheduled entry of a new cohort on a superior technology.
    pub fn second_generation_entry(&mut self, time: u32, tech: usize, rng: &mut JavaRandom) {
        let tec = &self.technologies[tech];
        info!(
            "t={time}: {} second-generation firms enter on {:?}",
            tec.num_entrants, tec.label
        );
        for _ in 0..tec.num_entrants {
            let id = self.firms.len();
            self.firms
                .push(Firm::new(id, time, Generation::Second, tech, tec, rng));
        }
    }

    /// Spawn a diversified division for every qualifying incumbent:
    /// alive, not yet a mother, serving the source segment on the
    /// triggering technology, with positive net worth and budget.
    ///
    /// The division starts at the target segment's current mean product
    /// levels and inherits fractions of the mother's budget and marketing
    /// capability.
    pub fn diversification_scan(
        &mut self,
        time: u32,
        rule: DiversificationRule,
        target_mean_cheap: f64,
        target_mean_perf: f64,
        rng: &mut JavaRandom,
    ) {
        let incumbents = self.firms.len();
        for f in 0..incumbents {
            let qualifies = {
                let firm = &self.firms[f];
                firm.alive
                    && !firm.mother
                    && firm.served_class == Some(rule.source_class)
                    && firm.tech == rule.tech
                    && firm.norm_net_worth > 0.0
                    && firm.budget > 0.0
            };
            if !qualifies {
                continue;
            }
            let id = self.firms.len();
            let endowment = self.firms[f].budget * self.params.phi_div;
            let capability = self.firms[f].mkting_capab * self.params.psi_div;
            debug!("t={time}: firm {f} diversifies, spawning firm {id}");
            let division = Firm::spin_off(
                id,
                time,
                rule.tech,
                endowment,
                capability,
                rule.target_class,
                target_mean_cheap,
                target_mean_perf,
                rng,
            );
            self.firms.push(division);
            self.firms[f].diversify(&self.params);
        }
    }

    /// R&D investment for every alive firm, in index order.
    pub fn rd_invest(&mut self, time: u32, rng: &mut JavaRandom) {
        for firm in self.firms.iter_mut() {
            if firm.alive {
                firm.rd_investment(time, &self.params, rng);
            }
        }
    }

    /// Marketing investment for every alive firm.
    pub fn marketing_invest(&mut self) {
        for firm in self.firms.iter_mut() {
            if firm.alive {
                firm.adv_expenditure(&self.params);
            }
        }
    }

    /// Adoption check for every alive, entered firm not yet on the new
    /// technology, against the best progress any firm has made on it.
    pub fn adoption_check(&mut self, new_tech: usize, rng: &mut JavaRandom) {
        let best = self.best_progress(new_tech);
        for firm in self.firms.iter_mut() {
            if firm.alive && firm.entered && firm.tech != new_tech {
                let current = &self.technologies[firm.tech];
                firm.adoption(current, best, new_tech, &self.params, rng);
            }
        }
    }

    /// Largest normalized distance covered by any alive firm on the given
    /// technology.
    pub fn best_progress(&self, tech: usize) -> f64 {
        let tec = &self.technologies[tech];
        let mut best = 0.0;
        for firm in &self.firms {
            if firm.alive && firm.tech == tech {
                let distance = firm.distance_covered(tec);
                if distance > best {
                    best = distance;
                }
            }
        }
        best
    }

    /// Stochastic technical change for every alive firm.
    pub fn innovation(&mut self, rng: &mut JavaRandom) {
        for firm in self.firms.iter_mut() {
            if firm.alive {
                let tec = &self.technologies[firm.tech];
                firm.innovation(tec, &self.params, rng);
            }
        }
    }

    /// Debt service, interest and the exit decision for every alive firm.
    pub fn accounting(&mut self, time: u32) {
        for firm in self.firms.iter_mut() {
            if firm.alive {
                firm.accounting(time, &self.params);
            }
        }
    }

    pub fn alive_firms(&self) -> usize {
        self.firms.iter().filter(|f| f.alive).count()
    }

    /// Alive firms tallied by cohort.
    pub fn alive_by_generation(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for firm in self.firms.iter().filter(|f| f.alive) {
            counts[firm.generation.index()] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimParams;

    fn two_tech_industry(rng: &mut JavaRandom) -> Industry {
        let params = SimParams::computer_industry();
        Industry::new(params.industry, params.technologies, rng)
    }

    #[test]
    fn first_generation_fills_the_initial_cohort() {
        let mut rng = JavaRandom::new(13);
        let industry = two_tech_industry(&mut rng);
        assert_eq!(industry.firms.len(), 20);
        assert!(industry.firms.iter().all(|f| f.alive));
        assert!(industry
            .firms
            .iter()
            .all(|f| f.generation == Generation::First && f.tech == 0));
        // Ids are the stable indices.
        for (i, firm) in industry.firms.iter().enumerate() {
            assert_eq!(firm.id, i);
        }
    }

    #[test]
    fn second_generation_appends_without_disturbing_incumbents() {
        let mut rng = JavaRandom::new(13);
        let mut industry = two_tech_industry(&mut rng);
        let snapshot: Vec<f64> = industry.firms.iter().map(|f| f.init_budget).collect();
        industry.second_generation_entry(60, 1, &mut rng);
        assert_eq!(industry.firms.len(), 40);
        for (i, &budget) in snapshot.iter().enumerate() {
            assert_eq!(industry.firms[i].init_budget, budget);
        }
        let newcomer = &industry.firms[25];
        assert_eq!(newcomer.generation, Generation::Second);
        assert_eq!(newcomer.tech, 1);
        assert_eq!(newcomer.birth_period, 60);
        assert!(newcomer.init_budget >= 4000.0 && newcomer.init_budget < 8000.0);
    }

    #[test]
    fn diversification_spawns_one_division_per_qualifying_mother() {
        let mut rng = JavaRandom::new(13);
        let mut industry = two_tech_industry(&mut rng);
        let rule = DiversificationRule {
            source_class: 0,
            target_class: 1,
            tech: 1,
            aware_threshold: 0.5,
        };
        // Qualify firms 0 and 3.
        for f in [0, 3] {
            industry.firms[f].served_class = Some(0);
            industry.firms[f].entered = true;
            industry.firms[f].tech = 1;
            industry.firms[f].norm_net_worth = 0.5;
        }
        let before = industry.firms.len();
        let mother_budget = industry.firms[0].budget;
        industry.diversification_scan(90, rule, 2600.0, 1200.0, &mut rng);

        assert_eq!(industry.firms.len(), before + 2);
        assert!(industry.firms[0].mother);
        assert!(!industry.firms[1].mother);
        let child = &industry.firms[before];
        assert_eq!(child.generation, Generation::Diversified);
        assert_eq!(child.served_class, Some(1));
        assert_eq!(child.budget, mother_budget * industry.params.phi_div);
        assert_eq!(child.cheap, 2600.0);
        assert_eq!(child.perf, 1200.0);
        assert_eq!(
            industry.firms[0].budget,
            mother_budget * (1.0 - industry.params.phi_div)
        );

        // A mother never diversifies twice.
        let len = industry.firms.len();
        industry.diversification_scan(91, rule, 2600.0, 1200.0, &mut rng);
        assert_eq!(industry.firms.len(), len);
    }

    #[test]
    fn best_progress_ignores_dead_firms_and_other_technologies() {
        let mut rng = JavaRandom::new(13);
        let mut industry = two_tech_industry(&mut rng);
        assert_eq!(industry.best_progress(1), 0.0);
        industry.firms[2].tech = 1;
        industry.firms[2].cheap = 5000.0;
        industry.firms[2].perf = 3000.0;
        let covered = industry.firms[2].distance_covered(&industry.technologies[1]);
        assert_eq!(industry.best_progress(1), covered);
        industry.firms[2].exit();
        assert_eq!(industry.best_progress(1), 0.0);
    }

    #[test]
    fn phase_loops_skip_dead_firms() {
        let mut rng = JavaRandom::new(13);
        let mut industry = two_tech_industry(&mut rng);
        industry.firms[0].exit();
        let dead = industry.firms[0].clone();
        industry.rd_invest(5, &mut rng);
        industry.marketing_invest();
        industry.innovation(&mut rng);
        industry.accounting(5);
        assert_eq!(industry.firms[0], dead, "dead firm must stay inert");
        assert_eq!(industry.alive_firms(), 19);
        assert_eq!(industry.alive_by_generation(), [19, 0, 0]);
    }
}
