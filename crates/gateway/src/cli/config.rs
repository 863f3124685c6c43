use li_domain::config::{Config, ConfigSeverity};
use li_domain::rules::RuleTable;

/// Parse and validate the config, printing any issues.
///
/// Exits with code 0 when valid, code 1 when errors are found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    // Rule regexes only surface when compiled.
    let rules_ok = match RuleTable::compile(&config.rules) {
        Ok(_) => true,
        Err(e) => {
            println!("[ERROR] rules: {e}");
            false
        }
    };

    if issues.is_empty() {
        if rules_ok {
            println!("Config OK ({config_path})");
        }
        return rules_ok;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;
    let error_count = error_count + usize::from(!rules_ok);

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_alone_pass_validation() {
        assert!(validate(&Config::default(), "config.toml"));
    }

    #[test]
    fn bad_rule_pattern_fails_validation() {
        let mut config = Config::default();
        config
            .rules
            .extra_patterns
            .insert("jailbreak".into(), vec!["(unclosed".into()]);
        assert!(!validate(&config, "config.toml"));
    }
}
