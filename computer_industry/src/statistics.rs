//! Per-period aggregate recording over the model's read surface.
//!
//! The recorder samples; it never mutates the model and does no I/O.
//! Drivers decide what to do with the rows.

use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Aggregates of one demand segment in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub label: String,
    pub serving_firms: usize,
    pub size: f64,
    pub herfindahl: f64,
    pub mean_cheap: f64,
    pub mean_perf: f64,
    pub share_first_gen: f64,
    pub share_second_gen: f64,
    pub share_best_second: f64,
    pub share_diversified: f64,
    pub num_adopting: usize,
}

/// Industry-wide aggregates of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub period: u32,
    pub alive_firms: usize,
    /// Alive firms by cohort: first, second, diversified.
    pub alive_by_generation: [usize; 3],
    pub classes: Vec<ClassRecord>,
}

/// Accumulates one [`PeriodRecord`] per sampled period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecorder {
    pub records: Vec<PeriodRecord>,
}

impl StatisticsRecorder {
    pub fn new() -> Self {
        StatisticsRecorder::default()
    }

    /// Sample the model's current state, typically once after each step.
    pub fn record(&mut self, model: &Model) {
        let classes = model
            .user_classes
            .iter()
            .map(|class| ClassRecord {
                label: class.params.label.clone(),
                serving_firms: class.serving_firms,
                size: class.size,
                herfindahl: class.herfindahl,
                mean_cheap: class.mean_cheap,
                mean_perf: class.mean_perf,
                share_first_gen: class.share_first_gen,
                share_second_gen: class.share_second_gen,
                share_best_second: class.share_best_second,
                share_diversified: class.share_diversified,
                num_adopting: class.num_adopting,
            })
            .collect();
        self.records.push(PeriodRecord {
            period: model.time,
            alive_firms: model.industry.alive_firms(),
            alive_by_generation: model.industry.alive_by_generation(),
            classes,
        });
    }

    pub fn last(&self) -> Option<&PeriodRecord> {
        self.records.last()
    }
}
