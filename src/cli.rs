use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipserve")]
#[command(version)]
#[command(about = "Serve files extracted on the fly from ZIP archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipserve -c /etc/zipserve.yaml             serve the routes in /etc/zipserve.yaml\n  \
  zipserve -c site.yaml -l 0.0.0.0:8080      same, overriding the listen address\n  \
  zipserve -c site.yaml -vv                  trace every archive access")]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, value_name = "FILE", default_value = "zipserve.yaml")]
    pub config: PathBuf,

    /// Listen address, overrides the configuration file
    #[arg(short = 'l', long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// More logging (-v => debug, -vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["zipserve"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("zipserve.yaml"));
        assert_eq!(cli.listen, None);
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from(["zipserve", "-c", "/etc/z.yaml", "-l", "0.0.0.0:80", "-vv"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/z.yaml"));
        assert_eq!(cli.listen.as_deref(), Some("0.0.0.0:80"));
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_quiet() {
        let cli = Cli::try_parse_from(["zipserve", "-q"]).unwrap();
        assert_eq!(cli.log_filter(), "error");
        assert!(Cli::try_parse_from(["zipserve", "-q", "-v"]).is_err());
    }
}
