//! Constraint checks for module settings

use std::fmt::Display;

use crate::application::errors::ConfigError;

pub fn check_len(key: &str, value: &str, min: usize, max: usize) -> Result<(), ConfigError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ConfigError::invalid(
            key,
            format!("length {} is outside {}..={}", len, min, max),
        ));
    }
    Ok(())
}

pub fn check_range<T>(key: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + Display,
{
    if value < min || value > max {
        return Err(ConfigError::invalid(
            key,
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    Ok(())
}

pub fn check_option<T>(key: &str, value: T, options: &[T]) -> Result<(), ConfigError>
where
    T: PartialEq + Display,
{
    if !options.contains(&value) {
        let allowed: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        return Err(ConfigError::invalid(
            key,
            format!("{} is not one of [{}]", value, allowed.join(", ")),
        ));
    }
    Ok(())
}
