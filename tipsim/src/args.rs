use clap::{arg, parser::ValueSource::DefaultValue, Arg, ArgAction, Command};
use serde::Deserialize;
use std::{ffi::OsString, fs, time::Duration};
use tangle_tipselect::{
    config::{Config, PoolConfig},
    model::MilestoneIndex,
};
use thiserror::Error;
use toml::from_str;

#[derive(Error, Debug)]
pub enum ArgsError {
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("failed reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed parsing config file, reason: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

pub type ArgsResult<T> = std::result::Result<T, ArgsError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Args {
    // NOTE: property names match config file fields
    pub bps: f64,
    pub sim_time: u64,
    pub milestone_interval: u64,
    pub spammer_share: f64,
    pub seed: Option<u64>,
    pub logdir: Option<String>,
    #[serde(rename = "loglevel")]
    pub log_level: String,
    pub quiet: bool,

    pub max_delta_youngest_cone_root_index: MilestoneIndex,
    pub max_delta_oldest_cone_root_index: MilestoneIndex,
    pub below_max_depth: MilestoneIndex,

    pub non_lazy_tips_limit: usize,
    pub non_lazy_max_tip_age_ms: u64,
    pub non_lazy_max_children: u32,
    pub non_lazy_spammer_threshold: usize,

    pub semi_lazy_tips_limit: usize,
    pub semi_lazy_max_tip_age_ms: u64,
    pub semi_lazy_max_children: u32,
    pub semi_lazy_spammer_threshold: usize,
}

impl Default for Args {
    fn default() -> Self {
        let config = Config::build_default();
        Self {
            bps: 20.0,
            sim_time: 30,
            milestone_interval: 10,
            spammer_share: 0.2,
            seed: None,
            logdir: None,
            log_level: "info".into(),
            quiet: false,

            max_delta_youngest_cone_root_index: config.max_delta_block_youngest_cone_root_index_to_cmi,
            max_delta_oldest_cone_root_index: config.max_delta_block_oldest_cone_root_index_to_cmi,
            below_max_depth: config.below_max_depth,

            non_lazy_tips_limit: config.non_lazy.retention_rules_tips_limit,
            non_lazy_max_tip_age_ms: config.non_lazy.max_referenced_tip_age.as_millis() as u64,
            non_lazy_max_children: config.non_lazy.max_children,
            non_lazy_spammer_threshold: config.non_lazy.spammer_tips_threshold,

            semi_lazy_tips_limit: config.semi_lazy.retention_rules_tips_limit,
            semi_lazy_max_tip_age_ms: config.semi_lazy.max_referenced_tip_age.as_millis() as u64,
            semi_lazy_max_children: config.semi_lazy.max_children,
            semi_lazy_spammer_threshold: config.semi_lazy.spammer_tips_threshold,
        }
    }
}

impl Args {
    pub fn parse<I, T>(itr: I) -> ArgsResult<Args>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let m: clap::ArgMatches = cli().try_get_matches_from(itr)?;
        let mut defaults: Args = Default::default();

        if let Some(config_file) = m.get_one::<String>("configfile") {
            let config_str = fs::read_to_string(config_file)?;
            defaults = from_str(&config_str)?;
        }

        let args = Args {
            bps: arg_match_unwrap_or::<f64>(&m, "bps", defaults.bps),
            sim_time: arg_match_unwrap_or::<u64>(&m, "sim-time", defaults.sim_time),
            milestone_interval: arg_match_unwrap_or::<u64>(&m, "milestone-interval", defaults.milestone_interval),
            spammer_share: arg_match_unwrap_or::<f64>(&m, "spammer-share", defaults.spammer_share),
            seed: m.get_one::<u64>("seed").cloned().or(defaults.seed),
            logdir: m.get_one::<String>("logdir").cloned().or(defaults.logdir),
            log_level: arg_match_unwrap_or::<String>(&m, "loglevel", defaults.log_level),
            quiet: arg_match_unwrap_or::<bool>(&m, "quiet", defaults.quiet),

            max_delta_youngest_cone_root_index: arg_match_unwrap_or::<MilestoneIndex>(
                &m,
                "max-delta-youngest-cone-root-index",
                defaults.max_delta_youngest_cone_root_index,
            ),
            max_delta_oldest_cone_root_index: arg_match_unwrap_or::<MilestoneIndex>(
                &m,
                "max-delta-oldest-cone-root-index",
                defaults.max_delta_oldest_cone_root_index,
            ),
            below_max_depth: arg_match_unwrap_or::<MilestoneIndex>(&m, "below-max-depth", defaults.below_max_depth),

            non_lazy_tips_limit: arg_match_unwrap_or::<usize>(&m, "non-lazy-tips-limit", defaults.non_lazy_tips_limit),
            non_lazy_max_tip_age_ms: arg_match_unwrap_or::<u64>(&m, "non-lazy-max-tip-age-ms", defaults.non_lazy_max_tip_age_ms),
            non_lazy_max_children: arg_match_unwrap_or::<u32>(&m, "non-lazy-max-children", defaults.non_lazy_max_children),
            non_lazy_spammer_threshold: arg_match_unwrap_or::<usize>(
                &m,
                "non-lazy-spammer-threshold",
                defaults.non_lazy_spammer_threshold,
            ),

            semi_lazy_tips_limit: arg_match_unwrap_or::<usize>(&m, "semi-lazy-tips-limit", defaults.semi_lazy_tips_limit),
            semi_lazy_max_tip_age_ms: arg_match_unwrap_or::<u64>(&m, "semi-lazy-max-tip-age-ms", defaults.semi_lazy_max_tip_age_ms),
            semi_lazy_max_children: arg_match_unwrap_or::<u32>(&m, "semi-lazy-max-children", defaults.semi_lazy_max_children),
            semi_lazy_spammer_threshold: arg_match_unwrap_or::<usize>(
                &m,
                "semi-lazy-spammer-threshold",
                defaults.semi_lazy_spammer_threshold,
            ),
        };

        args.validate()?;
        Ok(args)
    }

    fn validate(&self) -> ArgsResult<()> {
        if !self.bps.is_finite() || self.bps <= 0.0 {
            return Err(ArgsError::InvalidValue("bps", "expected a positive rate".to_string()));
        }
        if !(0.0..=1.0).contains(&self.spammer_share) {
            return Err(ArgsError::InvalidValue("spammer-share", "expected a share between 0 and 1".to_string()));
        }
        if self.sim_time == 0 {
            return Err(ArgsError::InvalidValue("sim-time", "expected a positive duration".to_string()));
        }
        if self.milestone_interval == 0 {
            return Err(ArgsError::InvalidValue("milestone-interval", "expected a positive block count".to_string()));
        }
        Ok(())
    }

    pub fn tipsel_config(&self) -> Config {
        Config::new(
            self.max_delta_youngest_cone_root_index,
            self.max_delta_oldest_cone_root_index,
            self.below_max_depth,
            PoolConfig::new(
                self.non_lazy_tips_limit,
                Duration::from_millis(self.non_lazy_max_tip_age_ms),
                self.non_lazy_max_children,
                self.non_lazy_spammer_threshold,
            ),
            PoolConfig::new(
                self.semi_lazy_tips_limit,
                Duration::from_millis(self.semi_lazy_max_tip_age_ms),
                self.semi_lazy_max_children,
                self.semi_lazy_spammer_threshold,
            ),
        )
    }
}

fn value_arg(id: impl Into<String>, value_name: &'static str, help: String) -> Arg {
    let id = id.into();
    Arg::new(id.clone()).long(id).value_name(value_name).require_equals(true).help(help)
}

pub fn cli() -> Command {
    let defaults: Args = Default::default();

    Command::new("tipsim")
        .about(format!("{} v{}", env!("CARGO_PKG_DESCRIPTION"), env!("CARGO_PKG_VERSION")))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(arg!(-C --configfile <CONFIG_FILE> "Path of config file."))
        .arg(arg!(--logdir <LOG_DIR> "Directory to log output."))
        .arg(
            Arg::new("loglevel")
                .short('d')
                .long("loglevel")
                .value_name("LEVEL")
                .default_value("info")
                .require_equals(true)
                .help("Logging level for all subsystems {off, error, warn, info, debug, trace}\n-- You may also specify <subsystem>=<level>,<subsystem2>=<level>,... to set the log level for individual subsystems."),
        )
        .arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).help("Avoid periodic tip pool reports."))
        .arg(
            value_arg("bps", "BPS", format!("Blocks issued per second (default: {}).", defaults.bps))
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            value_arg("sim-time", "SECONDS", format!("Simulation time in seconds (default: {}).", defaults.sim_time))
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            value_arg(
                "milestone-interval",
                "BLOCKS",
                format!("Number of blocks issued between milestones (default: {}).", defaults.milestone_interval),
            )
            .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            value_arg(
                "spammer-share",
                "SHARE",
                format!("Share of blocks issued on spammer tips (default: {}).", defaults.spammer_share),
            )
            .value_parser(clap::value_parser!(f64)),
        )
        .arg(value_arg("seed", "SEED", "Seed of the simulation randomness.".to_string()).value_parser(clap::value_parser!(u64)))
        .arg(
            value_arg(
                "max-delta-youngest-cone-root-index",
                "INDEX",
                format!(
                    "Milestones a block's youngest cone root may lag behind before it is lazy (default: {}).",
                    defaults.max_delta_youngest_cone_root_index
                ),
            )
            .value_parser(clap::value_parser!(MilestoneIndex)),
        )
        .arg(
            value_arg(
                "max-delta-oldest-cone-root-index",
                "INDEX",
                format!(
                    "Milestones a block's oldest cone root may lag behind before it is semi-lazy (default: {}).",
                    defaults.max_delta_oldest_cone_root_index
                ),
            )
            .value_parser(clap::value_parser!(MilestoneIndex)),
        )
        .arg(
            value_arg(
                "below-max-depth",
                "INDEX",
                format!("Milestones a block's oldest cone root may lag behind before it is lazy (default: {}).", defaults.below_max_depth),
            )
            .value_parser(clap::value_parser!(MilestoneIndex)),
        )
        .args(pool_args("non-lazy", &defaults.tipsel_config().non_lazy))
        .args(pool_args("semi-lazy", &defaults.tipsel_config().semi_lazy))
}

fn pool_args(pool: &'static str, defaults: &PoolConfig) -> Vec<Arg> {
    let id = |name: &str| format!("{}-{}", pool, name);
    vec![
        value_arg(
            id("tips-limit"),
            "COUNT",
            format!("Pool size above which referenced {} tips are removed right away (default: {}).", pool, defaults.retention_rules_tips_limit),
        )
        .value_parser(clap::value_parser!(usize)),
        value_arg(
            id("max-tip-age-ms"),
            "MILLISECONDS",
            format!(
                "Time a referenced {} tip remains selectable, 0 disables it (default: {}).",
                pool,
                defaults.max_referenced_tip_age.as_millis()
            ),
        )
        .value_parser(clap::value_parser!(u64)),
        value_arg(
            id("max-children"),
            "COUNT",
            format!("Number of children after which a {} tip is removed (default: {}).", pool, defaults.max_children),
        )
        .value_parser(clap::value_parser!(u32)),
        value_arg(
            id("spammer-threshold"),
            "COUNT",
            format!("{} pool size driving the spammer tip selection, 0 disables it (default: {}).", pool, defaults.spammer_tips_threshold),
        )
        .value_parser(clap::value_parser!(usize)),
    ]
}

pub fn parse_args() -> Args {
    match Args::parse(std::env::args_os()) {
        Ok(args) => args,
        Err(ArgsError::Cli(err)) => err.exit(),
        Err(err) => {
            println!("{err}");
            std::process::exit(1);
        }
    }
}

fn arg_match_unwrap_or<T: Clone + Send + Sync + 'static>(m: &clap::ArgMatches, arg_id: &str, default: T) -> T {
    m.get_one::<T>(arg_id).cloned().filter(|_| m.value_source(arg_id) != Some(DefaultValue)).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse(["tipsim"]).unwrap();
        assert_eq!(args, Args::default());
        assert_eq!(args.tipsel_config(), Config::build_default());
    }

    #[test]
    fn test_cli_args() {
        let args = Args::parse(["tipsim", "--bps=50", "--seed=3", "-q", "--non-lazy-max-children=5", "--semi-lazy-tips-limit=7"]).unwrap();
        assert_eq!(args.bps, 50.0);
        assert_eq!(args.seed, Some(3));
        assert!(args.quiet);

        let config = args.tipsel_config();
        assert_eq!(config.non_lazy.max_children, 5);
        assert_eq!(config.semi_lazy.retention_rules_tips_limit, 7);
        assert_eq!(config.non_lazy.retention_rules_tips_limit, Config::build_default().non_lazy.retention_rules_tips_limit);
    }

    #[test]
    fn test_config_file_args() {
        let file = config_file("bps = 5.0\nloglevel = \"debug\"\nnon-lazy-max-tip-age-ms = 0\nsemi-lazy-spammer-threshold = 12\n");
        let path = file.path().to_str().unwrap();

        let args = Args::parse(["tipsim", "-C", path]).unwrap();
        assert_eq!(args.bps, 5.0);
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.tipsel_config().non_lazy.max_referenced_tip_age, Duration::ZERO);
        assert_eq!(args.tipsel_config().semi_lazy.spammer_tips_threshold, 12);

        // Explicit command line values take precedence over the file
        let args = Args::parse(["tipsim", "-C", path, "--bps=9", "--loglevel=warn"]).unwrap();
        assert_eq!(args.bps, 9.0);
        assert_eq!(args.log_level, "warn");
        assert_eq!(args.tipsel_config().semi_lazy.spammer_tips_threshold, 12);
    }

    #[test]
    fn test_invalid_args() {
        let file = config_file("unknown-key = 1\n");
        assert!(matches!(Args::parse(["tipsim", "-C", file.path().to_str().unwrap()]), Err(ArgsError::Toml(_))));
        assert!(matches!(Args::parse(["tipsim", "-C", "/nonexistent/tipsim.toml"]), Err(ArgsError::Io(_))));
        assert!(matches!(Args::parse(["tipsim", "--spammer-share=1.5"]), Err(ArgsError::InvalidValue("spammer-share", _))));
        assert!(matches!(Args::parse(["tipsim", "--milestone-interval=0"]), Err(ArgsError::InvalidValue("milestone-interval", _))));
        assert!(matches!(Args::parse(["tipsim", "--bps=fast"]), Err(ArgsError::Cli(_))));
    }
}
