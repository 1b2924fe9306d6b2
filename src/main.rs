/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */
mod cli;

use std::io::{self, BufRead, Write};

use clap::Parser;
use cli::Cli;

use utipmisim::config;
use utipmisim::emu::sdr::{
    IPMI_SDR_DELETE_SUPPORTED, IPMI_SDR_GET_ALLOC_INFO_SUPPORTED, IPMI_SDR_MODAL_BOTH,
    IPMI_SDR_PARTIAL_ADD_SUPPORTED, IPMI_SDR_RESERVE_SUPPORTED,
};
use utipmisim::emu::sel::IPMI_SEL_ENABLE_FLAG_MASK;
use utipmisim::emu::Emulator;
use utipmisim::error::{val2str, EmuResult, COMPLETION_CODE_VALS};
use utipmisim::helper::{buf2str, str2buf};
use utipmisim::logging;

/// A BMC with every capability on, used when no configuration is given.
fn default_emulator() -> EmuResult<Emulator> {
    let mut emu = Emulator::new();
    emu.set_bmc_addr(0x20)?;
    emu.add_mc(0x20, 0x20, false, 0x01, 0x09, 0x00, 0xbf, [0, 0, 0], [0, 0], false)?;

    let mc = emu.mc_mut(0x20)?;
    mc.enable_sel(128, IPMI_SEL_ENABLE_FLAG_MASK);
    mc.set_main_sdr_support(
        IPMI_SDR_GET_ALLOC_INFO_SUPPORTED
            | IPMI_SDR_RESERVE_SUPPORTED
            | IPMI_SDR_PARTIAL_ADD_SUPPORTED
            | IPMI_SDR_DELETE_SUPPORTED
            | (IPMI_SDR_MODAL_BOTH << 5),
    );
    Ok(emu)
}

fn main() {
    let cli = Cli::parse();
    logging::setup_logger(cli.verbose);

    let built = match &cli.config {
        Some(path) => config::load_file(path).and_then(|cfg| cfg.build()),
        None => default_emulator(),
    };
    let mut emu = match built {
        Ok(emu) => emu,
        Err(err) => {
            eprintln!("Unable to set up emulator: {}", err);
            std::process::exit(1);
        }
    };

    log::info!(
        "BMC at 0x{:02x}; type requests as hex bytes (netfn<<2|lun cmd data...)",
        emu.bmc_addr()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let request = match str2buf(line) {
            Some(bytes) if bytes.len() >= 2 => bytes,
            _ => {
                eprintln!("expected hex bytes: netfn<<2|lun cmd data...");
                continue;
            }
        };

        let rsp = emu.handle_msg(cli.lun, &request);
        if rsp.is_empty() {
            println!("(response consumed)");
        } else {
            println!(
                "{}  # {}",
                buf2str(&rsp),
                val2str(rsp[0], &COMPLETION_CODE_VALS)
            );
        }
    }
}
