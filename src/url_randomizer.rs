use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use url::Url;

use crate::config::{IntRule, RandomizerConfig, StringRule};
use crate::error::{Result, RunError};

/// Render one URL; int rules first, then string rules
pub fn render<R: Rng + ?Sized>(
    template: &str,
    int_rules: &[IntRule],
    string_rules: &[StringRule],
    rng: &mut R,
) -> Result<Url> {
    let mut rendered = template.to_string();

    for rule in int_rules {
        let value = rng.gen_range(rule.min..=rule.max);
        rendered = rendered.replace(&rule.key, &value.to_string());
    }

    for rule in string_rules {
        let choice = &rule.choices[rng.gen_range(0..rule.choices.len())];
        rendered = rendered.replace(&rule.key, choice);
    }

    Url::parse(&rendered).map_err(|e| RunError::MalformedUrl {
        url: rendered,
        reason: e.to_string(),
    })
}

/// Seeded template renderer; one instance per run
pub struct UrlRandomizer {
    rng: StdRng,
    int_rules: Vec<IntRule>,
    string_rules: Vec<StringRule>,
}

impl UrlRandomizer {
    pub fn new(config: &RandomizerConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed as u64),
            int_rules: config.int_rules.clone(),
            string_rules: config.string_rules.clone(),
        }
    }

    pub fn render(&mut self, template: &str) -> Result<Url> {
        render(template, &self.int_rules, &self.string_rules, &mut self.rng)
    }
}
