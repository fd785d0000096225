use std::collections::HashMap;

use crate::delay::{secs_per_char, speed_divisor};
use crate::directive::total_pause_secs;
use crate::language::LanguageProfile;
use crate::model::{Category, TypingPlan};

#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    pub chars: usize,
    pub spans: usize,
    pub spans_by_category: HashMap<Category, usize>,
    pub directives: usize,
    pub total_pause_secs: f64,
    /// Expected duration at the top of the WPM range.
    pub fastest_secs: f64,
    /// Expected duration at the bottom of the WPM range.
    pub slowest_secs: f64,
}

impl PlanStats {
    pub fn count(&self, category: Category) -> usize {
        self.spans_by_category.get(&category).copied().unwrap_or(0)
    }
}

pub fn stats(plan: &TypingPlan) -> PlanStats {
    let mut out = PlanStats {
        chars: plan.len_chars(),
        spans: plan.spans.len(),
        directives: plan.directives.len(),
        total_pause_secs: total_pause_secs(&plan.directives),
        ..Default::default()
    };

    for span in &plan.spans {
        *out.spans_by_category.entry(span.category).or_insert(0) += 1;
    }

    let statement_pause = plan.config.statement_pause_ms as f64 / 1000.0;
    let profile = LanguageProfile::lookup(&plan.config.language).ok();

    let mut divisor_weight = 0.0;
    let mut beats = 0usize;
    let mut prev: Option<char> = None;
    for (c, category) in plan.text.chars().zip(plan.categories()) {
        divisor_weight += 1.0 / speed_divisor(category);
        if let (Some(p), Some(profile)) = (prev, profile) {
            if profile.is_statement_terminator(p) {
                beats += 1;
            }
        }
        prev = Some(c);
    }

    let fixed = out.total_pause_secs + beats as f64 * statement_pause;
    if plan.config.wpm_max > 0.0 && plan.config.wpm_min > 0.0 {
        out.fastest_secs = divisor_weight * secs_per_char(plan.config.wpm_max) + fixed;
        out.slowest_secs = divisor_weight * secs_per_char(plan.config.wpm_min) + fixed;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{generate_plan, TypingConfig};

    #[test]
    fn counts_spans_and_pauses() {
        let cfg = TypingConfig {
            wpm_min: 60.0,
            wpm_max: 60.0,
            statement_pause_ms: 0,
            ..Default::default()
        };
        let plan = generate_plan("int x;{{PAUSE:2}}", &cfg).unwrap();
        let s = stats(&plan);

        assert_eq!(s.chars, 6);
        assert_eq!(s.count(Category::Keyword), 1);
        assert_eq!(s.count(Category::Punctuation), 1);
        assert_eq!(s.directives, 1);
        assert_eq!(s.total_pause_secs, 2.0);

        // "int" at 1.8x, " x;" at 1x, 0.2s per char at 60 WPM.
        let expected = (3.0 / 1.8 + 3.0) * 0.2 + 2.0;
        assert!((s.fastest_secs - expected).abs() < 1e-9);
        assert_eq!(s.fastest_secs, s.slowest_secs);
    }
}
