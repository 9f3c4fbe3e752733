use crate::error::{bail, Error};

fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    match value {
        "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        _ => bail!("invalid value of {name}: expected '0', '1', 'true' or 'false', got {value:?}"),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>, Error> {
    match std::env::var(name) {
        Ok(value) => parse_env_bool(name, &value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => bail!("invalid value of {name}: not valid UTF-8"),
    }
}

/// Per-run analysis configuration.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Config {
    pub(crate) ignore_instruments: bool,
    pub(crate) strict_instruments: bool,
    pub(crate) carry_implied_instruments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Config {
            ignore_instruments: false,
            strict_instruments: false,
            carry_implied_instruments: true,
        }
    }

    /// Creates a new default configuration and seeds it from the environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::new();
        if let Some(value) = env_bool("RVMCA_IGNORE_INSTRUMENTS")? {
            config.ignore_instruments = value;
        }

        if let Some(value) = env_bool("RVMCA_STRICT_INSTRUMENTS")? {
            config.strict_instruments = value;
        }

        if let Some(value) = env_bool("RVMCA_CARRY_IMPLIED_INSTRUMENTS")? {
            config.carry_implied_instruments = value;
        }

        Ok(config)
    }

    /// Sets whether instrumentation directives are dropped altogether.
    ///
    /// Default: `false`
    ///
    /// Corresponding environment variable: `RVMCA_IGNORE_INSTRUMENTS` (`true`, `false`)
    pub fn set_ignore_instruments(&mut self, value: bool) -> &mut Self {
        self.ignore_instruments = value;
        self
    }

    /// Returns whether instrumentation directives are dropped altogether.
    pub fn ignore_instruments(&self) -> bool {
        self.ignore_instruments
    }

    /// Sets whether an invalid or unsupported instrumentation directive aborts the run.
    ///
    /// When disabled such directives are skipped with a warning.
    ///
    /// Default: `false`
    ///
    /// Corresponding environment variable: `RVMCA_STRICT_INSTRUMENTS` (`true`, `false`)
    pub fn set_strict_instruments(&mut self, value: bool) -> &mut Self {
        self.strict_instruments = value;
        self
    }

    /// Returns whether an invalid or unsupported instrumentation directive aborts the run.
    pub fn strict_instruments(&self) -> bool {
        self.strict_instruments
    }

    /// Sets whether instruments implied by vector configuration instructions
    /// (e.g. `vsetvli`) apply to the instructions which follow them.
    ///
    /// Default: `true`
    ///
    /// Corresponding environment variable: `RVMCA_CARRY_IMPLIED_INSTRUMENTS` (`true`, `false`)
    pub fn set_carry_implied_instruments(&mut self, value: bool) -> &mut Self {
        self.carry_implied_instruments = value;
        self
    }

    /// Returns whether instruments implied by vector configuration instructions are carried forward.
    pub fn carry_implied_instruments(&self) -> bool {
        self.carry_implied_instruments
    }
}
