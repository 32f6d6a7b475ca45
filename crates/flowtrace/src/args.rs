use clap::{Parser, ValueEnum};
use flowtrace_core::defaults;

const AFTER_HELP: &str = "The flow to trace is selected by a kernel filter rule installed \
out-of-band, for example:\n\n  iptables -A OUTPUT -j NFQUEUE --queue-num 0 -p tcp --dport 2666";

/// Trace the path of an existing TCP flow by riding its own packets
#[derive(Parser, Debug, Eq, PartialEq)]
#[command(name = "flowtrace", author, version, about, after_help = AFTER_HELP)]
pub struct Args {
    /// The network interface to capture ICMP replies on
    #[arg(short, long, env = "FLOWTRACE_IFACE")]
    pub iface: String,

    /// The netfilter queue number the flow is diverted to
    #[arg(short, long, default_value_t = 0, env = "FLOWTRACE_QUEUE")]
    pub queue: u16,

    /// The maximum time-to-live to probe (inclusive)
    #[arg(short = 't', long, default_value_t = defaults::DEFAULT_TTL_MAX)]
    pub max_ttl: u8,

    /// How many probes to send at each time-to-live
    #[arg(short = 'r', long, default_value_t = defaults::DEFAULT_TTL_REPEAT_MAX)]
    pub ttl_repeat: usize,

    /// Mangle only every N-th packet of the flow
    #[arg(short = 'f', long, default_value_t = defaults::DEFAULT_MANGLE_FREQ)]
    pub mangle_freq: usize,

    /// Seconds to wait for replies before advancing to the next hop
    #[arg(long, default_value_t = defaults::DEFAULT_RESPONSE_TIMEOUT.as_secs())]
    pub response_timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Log filter, e.g. flowtrace=debug,flowtrace_core=trace
    #[arg(long, default_value = "flowtrace=debug,flowtrace_core=debug")]
    pub log_filter: String,
}

/// How tracing output is formatted.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogFormat {
    /// Display log data in a compact report-like format.
    Compact,
    /// Display log data in a pretty verbose format.
    Pretty,
    /// Display log data in json format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["flowtrace", "--iface", "eth0"]).unwrap();
        assert_eq!("eth0", args.iface);
        assert_eq!(0, args.queue);
        assert_eq!(defaults::DEFAULT_TTL_MAX, args.max_ttl);
        assert_eq!(defaults::DEFAULT_TTL_REPEAT_MAX, args.ttl_repeat);
        assert_eq!(defaults::DEFAULT_MANGLE_FREQ, args.mangle_freq);
        assert_eq!(200, args.response_timeout);
        assert!(!args.verbose);
        assert_eq!(LogFormat::Compact, args.log_format);
    }

    #[test]
    fn test_parse_full() {
        let args = Args::try_parse_from([
            "flowtrace",
            "--iface",
            "wlan0",
            "--queue",
            "3",
            "--max-ttl",
            "12",
            "--ttl-repeat",
            "2",
            "--mangle-freq",
            "4",
            "--response-timeout",
            "30",
            "--verbose",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!("wlan0", args.iface);
        assert_eq!(3, args.queue);
        assert_eq!(12, args.max_ttl);
        assert_eq!(2, args.ttl_repeat);
        assert_eq!(4, args.mangle_freq);
        assert_eq!(30, args.response_timeout);
        assert!(args.verbose);
        assert_eq!(LogFormat::Json, args.log_format);
    }

    #[test]
    fn test_iface_is_required() {
        assert!(Args::try_parse_from(["flowtrace"]).is_err());
    }
}
