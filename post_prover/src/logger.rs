// Copyright (c) 2025 Proof of Capacity Consortium
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use crate::config::Cfg;
use crate::error::{ProveError, Result};

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

const LOGFILE: &str = "log/prover.1.log";
const LOGFILE_ROLL_PATTERN: &str = "log/prover.{}.log";

fn to_log_level(s: &str, default: LevelFilter) -> LevelFilter {
    match s.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => default,
    }
}

fn logging_error<E: std::fmt::Display>(e: E) -> ProveError {
    ProveError::Configuration(format!("logger setup failed: {}", e))
}

/// A leading `\r` keeps log lines from being glued to an active progress bar.
fn pattern(show_progress: bool, pattern: &str) -> String {
    let mut out = if show_progress {
        "\r".to_owned()
    } else {
        String::new()
    };
    out.push_str(pattern);
    out
}

fn build_config(cfg: &Cfg) -> Result<Config> {
    let level_console = to_log_level(&cfg.console_log_level, LevelFilter::Info);
    let level_logfile = to_log_level(&cfg.logfile_log_level, LevelFilter::Warn);

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&pattern(
            cfg.show_progress,
            &cfg.console_log_pattern,
        ))))
        .build();
    let stdout = Appender::builder()
        .filter(Box::new(ThresholdFilter::new(level_console)))
        .build("stdout", Box::new(stdout));

    if level_logfile == LevelFilter::Off {
        return Config::builder()
            .appender(stdout)
            .build(Root::builder().appender("stdout").build(level_console))
            .map_err(logging_error);
    }

    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(LOGFILE_ROLL_PATTERN, cfg.logfile_max_count)
        .map_err(logging_error)?;
    let trigger = SizeTrigger::new(cfg.logfile_max_size * 1024 * 1024);
    let policy = Box::new(CompoundPolicy::new(Box::new(trigger), Box::new(roller)));
    let logfile = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&pattern(
            cfg.show_progress,
            &cfg.logfile_log_pattern,
        ))))
        .build(LOGFILE, policy)
        .map_err(logging_error)?;

    Config::builder()
        .appender(stdout)
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level_logfile)))
                .build("logfile", Box::new(logfile)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("logfile")
                .build(LevelFilter::Trace),
        )
        .map_err(logging_error)
}

pub fn init_logger(cfg: &Cfg) -> Result<log4rs::Handle> {
    log4rs::init_config(build_config(cfg)?).map_err(logging_error)
}
