use std::time::Duration;

use anyhow::{ensure, Result};

use crate::classifier::PatternClassifier;
use crate::delay::{DelayModel, WpmRange};
use crate::directive::{parse_directives, MAX_PAUSE_SECS};
use crate::language::LanguageProfile;
use crate::model::{PlanConfig, TypingPlan, PLAN_VERSION};
use crate::whitespace;

#[derive(Debug, Clone)]
pub struct TypingConfig {
    pub language: String,
    pub wpm_min: f64,
    pub wpm_max: f64,
    pub skip_leading_whitespace: bool,
    pub statement_pause_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            language: "Java".to_string(),
            wpm_min: 100.0,
            wpm_max: 250.0,
            skip_leading_whitespace: false,
            statement_pause_ms: 200,
        }
    }
}

impl TypingConfig {
    fn from_plan(cfg: &PlanConfig) -> Self {
        Self {
            language: cfg.language.clone(),
            wpm_min: cfg.wpm_min,
            wpm_max: cfg.wpm_max,
            skip_leading_whitespace: cfg.skip_leading_whitespace,
            statement_pause_ms: cfg.statement_pause_ms,
        }
    }
}

/// Everything a session needs that is derived from a validated config.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub profile: &'static LanguageProfile,
    pub delay: DelayModel,
}

pub fn validate_config(cfg: &TypingConfig) -> Result<ValidatedConfig> {
    let range = WpmRange::new(cfg.wpm_min, cfg.wpm_max)?;
    ensure!(
        cfg.statement_pause_ms <= 60_000,
        "statement_pause_ms must be <= 60000"
    );
    let profile = LanguageProfile::lookup(&cfg.language)?;

    Ok(ValidatedConfig {
        profile,
        delay: DelayModel::new(range, Duration::from_millis(cfg.statement_pause_ms)),
    })
}

/// Re-check a plan loaded from disk before it is played.
pub fn validate_plan(plan: &TypingPlan) -> Result<ValidatedConfig> {
    ensure!(
        plan.version == PLAN_VERSION,
        "unsupported plan version {}; expected {PLAN_VERSION}",
        plan.version
    );
    let validated = validate_config(&TypingConfig::from_plan(&plan.config))?;

    let len = plan.len_chars();
    let covered: usize = plan.spans.iter().map(|s| s.len).sum();
    ensure!(
        covered == len,
        "plan spans cover {covered} characters but the text has {len}"
    );

    let mut last = 0usize;
    for d in &plan.directives {
        ensure!(d.offset <= len, "pause directive offset {} is past the end", d.offset);
        ensure!(d.offset >= last, "pause directives are out of order");
        ensure!(
            d.secs.is_finite() && (0.0..=MAX_PAUSE_SECS).contains(&d.secs),
            "pause directive duration {} is outside 0..={MAX_PAUSE_SECS}s",
            d.secs
        );
        last = d.offset;
    }

    Ok(validated)
}

/// Turn raw input into the stream that will be typed:
/// directive extraction, then leading-whitespace filtering, then classification.
pub fn generate_plan(raw_text: &str, cfg: &TypingConfig) -> Result<TypingPlan> {
    let validated = validate_config(cfg)?;

    let parsed = parse_directives(raw_text);
    let mut directives = parsed.directives;
    let text = whitespace::apply(parsed.text, &mut directives, cfg.skip_leading_whitespace);
    let spans = PatternClassifier::new(validated.profile).classify(&text);

    Ok(TypingPlan {
        version: PLAN_VERSION,
        config: PlanConfig {
            language: validated.profile.id.to_string(),
            wpm_min: cfg.wpm_min,
            wpm_max: cfg.wpm_max,
            skip_leading_whitespace: cfg.skip_leading_whitespace,
            statement_pause_ms: cfg.statement_pause_ms,
        },
        text,
        spans,
        directives,
        warnings: parsed.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Directive;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_bad_wpm_before_anything_else() {
        let cfg = TypingConfig {
            wpm_min: 0.0,
            ..Default::default()
        };
        let err = generate_plan("x", &cfg).unwrap_err();
        assert!(format!("{err:#}").contains("> 0"));

        let cfg = TypingConfig {
            wpm_min: 200.0,
            wpm_max: 100.0,
            ..Default::default()
        };
        assert!(generate_plan("x", &cfg).is_err());
    }

    #[test]
    fn rejects_unknown_language() {
        let cfg = TypingConfig {
            language: "Brainfuck".to_string(),
            ..Default::default()
        };
        assert!(generate_plan("x", &cfg).is_err());
    }

    #[test]
    fn canonicalizes_language_id() {
        let cfg = TypingConfig {
            language: "py".to_string(),
            ..Default::default()
        };
        let plan = generate_plan("def f(): pass", &cfg).unwrap();
        assert_eq!(plan.config.language, "Python");
    }

    #[test]
    fn directives_follow_whitespace_filtering() {
        let cfg = TypingConfig {
            skip_leading_whitespace: true,
            ..Default::default()
        };
        let plan = generate_plan("a {\n    {{PAUSE:1}}b;\n}", &cfg).unwrap();
        assert_eq!(plan.text, "a {\nb;\n}");
        assert_eq!(plan.directives, vec![Directive { offset: 4, secs: 1.0 }]);

        let joined: String = plan.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, plan.text);
    }

    #[test]
    fn loaded_plan_is_revalidated() {
        let mut plan = generate_plan("int x;", &TypingConfig::default()).unwrap();
        assert!(validate_plan(&plan).is_ok());

        plan.spans.pop();
        assert!(validate_plan(&plan).is_err());
    }

    #[test]
    fn loaded_pauses_must_be_in_range() {
        let plan = generate_plan("a{{PAUSE:1}}b", &TypingConfig::default()).unwrap();

        let mut bad = plan.clone();
        bad.directives[0].secs = 1e30;
        assert!(validate_plan(&bad).is_err());

        let mut bad = plan.clone();
        bad.directives[0].secs = MAX_PAUSE_SECS + 0.5;
        assert!(validate_plan(&bad).is_err());

        let mut edge = plan;
        edge.directives[0].secs = MAX_PAUSE_SECS;
        assert!(validate_plan(&edge).is_ok());
    }
}
