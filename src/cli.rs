/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "utipmisim",
    version = "0.9.0",
    about = "In-memory IPMI BMC emulator",
    max_term_width = 100
)]
pub struct Cli {
    #[arg(short = 'c', long, help = "Emulator configuration file (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', action = ArgAction::Count, help = "Verbose (can use multiple times)")]
    pub verbose: u8,

    #[arg(short = 'l', long, default_value_t = 0, help = "Request LUN for console requests")]
    pub lun: u8,
}
