//! Per-period orchestration and the single-run driver surface.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::industry::Industry;
use crate::params::{ParamsError, SimParams};
use crate::rng::JavaRandom;
use crate::user_class::UserClass;

/// One model instance: the industry, its demand segments, the single
/// PRNG every draw flows through, and the period counter.
///
/// The trajectory is a pure function of `(params, seed)`. All phase
/// triggers stay individually reachable through the public fields, so an
/// external driver can sequence a period by hand; [`Model::step`] is the
/// canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub params: SimParams,
    pub industry: Industry,
    /// Demand segments, visited in declaration order every period.
    pub user_classes: Vec<UserClass>,
    pub rng: JavaRandom,
    /// Last completed period; 0 before the first step.
    pub time: u32,
}

impl Model {
    pub fn new(params: SimParams, seed: u64) -> Result<Self, ParamsError> {
        params.validate()?;
        let mut rng = JavaRandom::new(seed);
        let industry = Industry::new(
            params.industry.clone(),
            params.technologies.clone(),
            &mut rng,
        );
        let user_classes = params
            .user_classes
            .iter()
            .enumerate()
            .map(|(index, class)| UserClass::new(index, class.clone()))
            .collect();
        Ok(Model {
            params,
            industry,
            user_classes,
            rng,
            time: 0,
        })
    }

    /// Advance one period through the fixed phase order: scheduled cohort
    /// entry, diversification scan, R&D, marketing, adoption, innovation,
    /// market allocation per segment, accounting.
    pub fn step(&mut self) {
        self.time += 1;
        let t = self.time;

        if let Some(entry) = self.params.second_generation {
            if t == entry.period {
                self.industry.second_generation_entry(t, entry.tech, &mut self.rng);
            }
        }

        if let Some(rule) = self.params.diversification {
            let target = &self.user_classes[rule.target_class];
            let source = &self.user_classes[rule.source_class];
            if target.size > 0.0 && target.size / source.size > rule.aware_threshold {
                let (mean_cheap, mean_perf) = (target.mean_cheap, target.mean_perf);
                self.industry
                    .diversification_scan(t, rule, mean_cheap, mean_perf, &mut self.rng);
            }
        }

        self.industry.rd_invest(t, &mut self.rng);
        self.industry.marketing_invest();

        if let Some(window) = self.params.adoption {
            if t > window.after {
                self.industry.adoption_check(window.tech, &mut self.rng);
            }
        }

        self.industry.innovation(&mut self.rng);

        for class in &mut self.user_classes {
            class.market(
                &mut self.industry.firms,
                &self.industry.params,
                t,
                &mut self.rng,
            );
        }

        self.industry.accounting(t);

        debug!(
            "t={t}: {} firms alive, {} slots",
            self.industry.alive_firms(),
            self.industry.firms.len()
        );
    }

    /// Run up to the configured horizon.
    pub fn run(&mut self) {
        while self.time < self.params.horizon {
            self.step();
        }
    }

    pub fn run_for(&mut self, periods: u32) {
        for _ in 0..periods {
            self.step();
        }
    }
}
