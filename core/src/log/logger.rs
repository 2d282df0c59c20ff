use super::LogError;
use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::HashMap, env, mem};

#[derive(Clone)]
pub(super) struct LoggerSpec {
    pub name: String,
    pub level: LevelFilter,
}

impl LoggerSpec {
    pub fn new(name: String, level: LevelFilter) -> Self {
        Self { name, level }
    }

    /// Module loggers carry no appender of their own and write through the root ones
    pub fn logger(&self) -> Logger {
        Logger::builder().build(self.name.clone(), self.level)
    }
}

pub(super) struct Loggers {
    loggers: Vec<LoggerSpec>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl Iterator<Item = Logger> + '_ {
        self.loggers.iter().map(|x| x.logger())
    }

    #[cfg(test)]
    pub fn level_of(&self, name: &str) -> Option<LevelFilter> {
        self.loggers.iter().find(|x| x.name == name).map(|x| x.level)
    }
}

/// Parses logger specs of the form `info,tangle_tipselect=debug` into per-module levels.
pub(super) struct Builder {
    loggers: HashMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { loggers: HashMap::new(), root_level: None }
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    #[cfg(test)]
    pub fn from_expression(expression: &str) -> Self {
        let mut builder = Self::new();
        builder.parse_expression(expression);
        builder
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(str::trim).filter(|spec| !spec.is_empty()) {
            match spec.split_once('=') {
                // A bare level sets the root level, a bare module name enables all its records
                None => match spec.parse() {
                    Ok(level) => {
                        self.root_level(level);
                    }
                    Err(_) => {
                        self.loggers.insert(spec.to_string(), LevelFilter::max());
                    }
                },
                Some((name, "")) => {
                    self.loggers.insert(name.trim().to_string(), LevelFilter::max());
                }
                Some((name, level)) => match level.trim().parse() {
                    Ok(level) => {
                        self.loggers.insert(name.trim().to_string(), level);
                    }
                    Err(_) => eprintln!("Ignoring invalid logging spec '{}'", LogError::ParseLoggerSpecError(spec.to_string())),
                },
            }
        }
        self
    }

    pub fn root_level(&mut self, root_level: LevelFilter) -> &mut Self {
        self.root_level.replace(root_level);
        self
    }

    pub fn build(&mut self) -> Loggers {
        let loggers = mem::take(&mut self.loggers).into_iter().map(|(name, level)| LoggerSpec::new(name, level)).collect::<Vec<_>>();
        Loggers { loggers, root_level: self.root_level.take().unwrap_or(LevelFilter::Error) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expression() {
        let loggers = Builder::from_expression("info, tangle_tipselect=trace,tipsim=bogus,tangle_core,a=b=c").build();
        assert_eq!(loggers.root_level(), LevelFilter::Info);
        assert_eq!(loggers.level_of("tangle_tipselect"), Some(LevelFilter::Trace));
        assert_eq!(loggers.level_of("tangle_core"), Some(LevelFilter::max()));
        assert_eq!(loggers.level_of("tipsim"), None);
        assert_eq!(loggers.level_of("a"), None);
    }

    #[test]
    fn test_default_root_level() {
        let loggers = Builder::new().build();
        assert_eq!(loggers.root_level(), LevelFilter::Error);
    }
}
