use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{ensure_parent_dir, get_config_path, Config};
use crate::scoring::validate_scoring;

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Serialize `config` and write it to `path`, creating parent directories.
pub fn write_config(path: &std::path::Path, config: &Config) -> Result<()> {
    let yaml = serde_saphyr::to_string(config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    ensure_parent_dir(path)?;

    std::fs::write(path, &yaml)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

/// Write a starter configuration.
///
/// With `assume_yes` nothing is asked: the starter is written with the
/// default category, replacing any existing file. Otherwise the user picks
/// the category and passing score and confirms overwrites.
pub fn run_init(path: Option<PathBuf>, assume_yes: bool) -> Result<()> {
    let config_path = match path {
        Some(path) => path,
        None => get_config_path()?,
    };

    let mut config = Config::starter("depression");

    if !assume_yes {
        println!();
        println!("qscore configuration");
        println!("====================");
        println!("The starter questionnaire has nine items scored 0-3 (max 27) with five severity bands.");
        println!();

        let category = prompt_with_default("Questionnaire category", "depression")?;
        config.category = Some(category);

        let passing = loop {
            let input = prompt_with_default("Passing score", "5")?;
            match input.parse::<f64>() {
                Ok(v) if (0.0..=27.0).contains(&v) => break v,
                _ => println!("  Invalid: must be a number between 0 and 27. Try again."),
            }
        };
        config.scoring.passing_score = Some(passing);

        if config_path.exists() {
            let overwrite = prompt_yes_no(
                &format!("Config already exists at {}. Overwrite?", config_path.display()),
                false,
            )?;
            if !overwrite {
                println!("Aborted.");
                return Ok(());
            }
        }
    }

    // The starter must always pass its own validation.
    if let Err(errors) = validate_scoring(&config.scoring) {
        anyhow::bail!("Starter configuration is invalid: {}", errors);
    }

    write_config(&config_path, &config)?;

    println!("Config written to {}", config_path.display());
    println!("Run `qscore validate` to check it, then `qscore score <answers.json>`.");

    Ok(())
}
