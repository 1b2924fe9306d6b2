/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

use env_logger::Env;
use std::env;
use std::io::Write;

struct LogColors {
    error: &'static str,
    warn: &'static str,
    info: &'static str,
    debug: &'static str,
    trace: &'static str,
    reset: &'static str,
}

impl LogColors {
    fn new(enable_color: bool) -> Self {
        if enable_color {
            Self {
                error: "\x1b[31m",
                warn: "\x1b[33m",
                info: "\x1b[32m",
                debug: "\x1b[36m",
                trace: "\x1b[35m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                error: "",
                warn: "",
                info: "",
                debug: "",
                trace: "",
                reset: "",
            }
        }
    }
}

/// Map the CLI -v count onto a logger level: 0 warns, 1 adds info, 2 adds
/// per-request debug, 3 and above everything.
pub fn setup_logger(verbose: u8) {
    let enable_color =
        env::var("NO_COLOR").is_err() && env::var("TERM").map_or(false, |term| term != "dumb");

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let colors = LogColors::new(enable_color);

    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format(move |buf, record| {
            let level_color = match record.level() {
                log::Level::Error => colors.error,
                log::Level::Warn => colors.warn,
                log::Level::Info => colors.info,
                log::Level::Debug => colors.debug,
                log::Level::Trace => colors.trace,
            };
            let level_text = match record.level() {
                log::Level::Error => "ERROR",
                log::Level::Warn => "WARN ",
                log::Level::Info => "INFO ",
                log::Level::Debug => "DEBUG",
                log::Level::Trace => "TRACE",
            };
            writeln!(
                buf,
                "{}[{}]{} {}",
                level_color,
                level_text,
                colors.reset,
                record.args()
            )
        })
        .is_test(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logger_is_reentrant() {
        setup_logger(2);
        setup_logger(0);
        log::debug!("logger smoke test");
    }
}
