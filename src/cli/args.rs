use clap::{ArgGroup, Parser};

/// Command line arguments for ComTunnel
#[derive(Parser, Debug)]
#[command(
    name = "comtunnel",
    version = env!("CARGO_PKG_VERSION"),
    about = "Share a local serial port with a remote peer over TCP",
    long_about = "Tunnels serial data and modem handshake lines (CTS/DSR/DCD/RI in, DTR/RTS out) between a local serial port and a TCP peer running the same framing protocol.",
    group(ArgGroup::new("role").required(true).args(["listen", "connect"]))
)]
pub struct Args {
    /// Listen for the peer on this address (e.g. 0.0.0.0:8080, tcp6://[::]:8080)
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Dial the peer at this address (e.g. 192.168.1.100:8080)
    #[arg(short, long, value_name = "ADDR")]
    pub connect: Option<String>,

    /// Serial config file; '-' reads it from stdin
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub config: Option<String>,

    /// Seconds to wait before redialing after a failed connection
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub retry_delay: u64,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_listen_mode() {
        let args = Args::try_parse_from(["comtunnel", "-l", "0.0.0.0:8080", "-f", "-"]).unwrap();
        assert_eq!(args.listen.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(args.connect, None);
        assert_eq!(args.config.as_deref(), Some("-"));
        assert_eq!(args.retry_delay, 5);
    }

    #[test]
    fn test_connect_mode_long_flags() {
        let args = Args::try_parse_from([
            "comtunnel",
            "--connect",
            "tcp://10.0.0.2:9000",
            "--file",
            "line.yml",
            "--retry-delay",
            "1",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.connect.as_deref(), Some("tcp://10.0.0.2:9000"));
        assert_eq!(args.retry_delay, 1);
        assert!(args.verbose);
    }

    #[test]
    fn test_role_is_required() {
        assert!(Args::try_parse_from(["comtunnel"]).is_err());
    }

    #[test]
    fn test_listen_and_connect_are_exclusive() {
        assert!(Args::try_parse_from(["comtunnel", "-l", ":1", "-c", "h:1"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Args::try_parse_from(["comtunnel", "-l", ":1", "-v", "-q"]).is_err());
    }
}
