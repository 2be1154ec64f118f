use crate::config::{load_global_settings, ConfigError, Settings};
use crate::runtime::{build_engine, EngineParts, RuntimeError};

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn map_runtime_err(err: RuntimeError) -> String {
    err.to_string()
}

pub fn load_settings() -> Result<Settings, String> {
    load_global_settings().map_err(map_config_err)
}

pub fn open_engine(settings: &Settings) -> Result<EngineParts, String> {
    build_engine(settings).map_err(map_runtime_err)
}

/// Splits `--flag value` pairs out of `args`, returning positional words in
/// order. Flags not listed in `known` are an error.
pub fn split_flags(
    args: &[String],
    known: &[&str],
) -> Result<(Vec<String>, Vec<(String, String)>), String> {
    let mut positional = Vec::new();
    let mut flags = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(name) = arg.strip_prefix("--") {
            if !known.contains(&name) {
                return Err(format!("unknown option `{arg}`"));
            }
            let value = iter
                .next()
                .ok_or_else(|| format!("option `{arg}` requires a value"))?;
            flags.push((name.to_string(), value.clone()));
        } else {
            positional.push(arg.clone());
        }
    }
    Ok((positional, flags))
}

pub fn flag_value<'a>(flags: &'a [(String, String)], name: &str) -> Option<&'a str> {
    flags
        .iter()
        .rev()
        .find(|(flag, _)| flag == name)
        .map(|(_, value)| value.as_str())
}
