use crate::config::{ModeConfig, ScoringConfig};
use crate::gameplay::rider::{LandingQuality, LandingReport};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComboPayout {
    pub amount: f32,
    pub combo: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LandingAward {
    None,
    Paid(f32),
    Banked { bonus: f32, combo: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreKeeper {
    pub score: f32,
    pub combo: u32,
    pub pending: f32,
    pub combo_timer: f32,
}

impl ScoreKeeper {
    pub fn accrue_passive(&mut self, scoring: &ScoringConfig, vx: f32, dt: f32, airborne: bool) {
        let factor = if airborne {
            scoring.passive.air_factor
        } else {
            scoring.passive.ground_factor
        };
        self.score += vx * dt * factor;
    }

    pub fn award_landing(
        &mut self,
        scoring: &ScoringConfig,
        mode: &ModeConfig,
        report: &LandingReport,
    ) -> LandingAward {
        let Some(bonus) = jump_bonus(scoring, report) else {
            return LandingAward::None;
        };

        if report.trick && mode.combo_enabled {
            self.pending += bonus;
            self.combo = self.combo.saturating_add(1);
            self.combo_timer = scoring.combo.grace_seconds;
            LandingAward::Banked {
                bonus,
                combo: self.combo,
            }
        } else {
            self.score += bonus;
            LandingAward::Paid(bonus)
        }
    }

    pub fn tick(&mut self, dt: f32) -> Option<ComboPayout> {
        if self.combo == 0 {
            return None;
        }
        self.combo_timer -= dt;
        if self.combo_timer > 0.0 {
            return None;
        }
        self.pay_out()
    }

    pub fn on_crash(&mut self, scoring: &ScoringConfig) -> Option<ComboPayout> {
        if scoring.combo.forfeit_on_crash {
            self.clear_combo();
            None
        } else {
            self.pay_out()
        }
    }

    pub fn pay_out(&mut self) -> Option<ComboPayout> {
        if self.combo == 0 {
            return None;
        }
        let payout = ComboPayout {
            amount: self.pending * self.combo as f32,
            combo: self.combo,
        };
        self.score += payout.amount;
        self.clear_combo();
        Some(payout)
    }

    pub fn clear_combo(&mut self) {
        self.combo = 0;
        self.pending = 0.0;
        self.combo_timer = 0.0;
    }
}

pub fn jump_bonus(scoring: &ScoringConfig, report: &LandingReport) -> Option<f32> {
    let bonus = &scoring.jump_bonus;
    if report.air_time < bonus.min_air_time_seconds {
        return None;
    }

    let height = report.peak_height / bonus.height_norm.max(1.0e-4);
    let air = report.air_time / bonus.air_time_norm_seconds.max(1.0e-4);
    let raw = (bonus.height_weight * height + bonus.air_time_weight * air).max(0.0);
    let quality = match report.quality {
        LandingQuality::Good => 1.0,
        LandingQuality::Perfect => bonus.perfect_multiplier,
    };

    Some((bonus.scale * raw.powf(bonus.exponent) * quality).clamp(bonus.min_bonus, bonus.max_bonus))
}
