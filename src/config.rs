/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! JSON configuration for the emulator domain: which MCs exist, their
//! repositories and their sensors. This is the external loader surface; the
//! protocol engine never reads files.

use std::path::Path;

use serde::Deserialize;

use crate::emu::sensor::NUM_EVENT_BITS;
use crate::emu::Emulator;
use crate::error::EmuResult;

fn default_bmc_addr() -> u8 {
    crate::ipmi::ipmi::IPMI_BMC_SLAVE_ADDR
}

fn default_sel_flags() -> u8 {
    crate::emu::sel::IPMI_SEL_ENABLE_FLAG_MASK
}

#[derive(Debug, Deserialize)]
pub struct EmuConfig {
    #[serde(default = "default_bmc_addr")]
    pub bmc_addr: u8,
    #[serde(default)]
    pub mcs: Vec<McConfig>,
}

#[derive(Debug, Deserialize)]
pub struct McConfig {
    pub ipmb: u8,
    pub device_id: u8,
    #[serde(default)]
    pub has_device_sdrs: bool,
    #[serde(default)]
    pub device_revision: u8,
    #[serde(default)]
    pub major_fw_rev: u8,
    #[serde(default)]
    pub minor_fw_rev: u8,
    pub device_support: u8,
    #[serde(default)]
    pub mfg_id: [u8; 3],
    #[serde(default)]
    pub product_id: [u8; 2],
    #[serde(default)]
    pub dynamic_sensor_population: bool,
    #[serde(default)]
    pub sel: Option<SelConfig>,
    /// Raw support/modal flag byte for the main SDR repository.
    #[serde(default)]
    pub sdr_flags: u8,
    #[serde(default)]
    pub main_sdrs: Vec<Vec<u8>>,
    #[serde(default)]
    pub device_sdrs: Vec<DeviceSdrConfig>,
    #[serde(default)]
    pub frus: Vec<FruConfig>,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SelConfig {
    pub max_entries: usize,
    #[serde(default = "default_sel_flags")]
    pub flags: u8,
}

#[derive(Debug, Deserialize)]
pub struct DeviceSdrConfig {
    pub lun: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct FruConfig {
    pub device_id: u8,
    pub length: usize,
    #[serde(default)]
    pub data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    pub lun: u8,
    pub num: u8,
    pub sensor_type: u8,
    pub event_reading_code: u8,
    #[serde(default)]
    pub value: u8,
    #[serde(default)]
    pub hysteresis: Option<HysteresisConfig>,
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,
    #[serde(default)]
    pub events: Option<EventSupportConfig>,
}

#[derive(Debug, Deserialize)]
pub struct HysteresisConfig {
    pub support: u8,
    #[serde(default)]
    pub positive: u8,
    #[serde(default)]
    pub negative: u8,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdConfig {
    pub support: u8,
    #[serde(default)]
    pub supported: [bool; 6],
    #[serde(default)]
    pub values: [u8; 6],
}

/// Event-bit lists name the bit indexes (0..14) rather than spelling out
/// fifteen booleans per mask.
#[derive(Debug, Deserialize)]
pub struct EventSupportConfig {
    #[serde(default)]
    pub events_enabled: bool,
    #[serde(default)]
    pub scanning_enabled: bool,
    pub support: u8,
    #[serde(default)]
    pub assert_supported: Vec<u8>,
    #[serde(default)]
    pub deassert_supported: Vec<u8>,
    #[serde(default)]
    pub assert_enabled: Vec<u8>,
    #[serde(default)]
    pub deassert_enabled: Vec<u8>,
}

fn bit_mask(bits: &[u8]) -> [bool; NUM_EVENT_BITS] {
    let mut mask = [false; NUM_EVENT_BITS];
    for &bit in bits {
        if usize::from(bit) < NUM_EVENT_BITS {
            mask[usize::from(bit)] = true;
        }
    }
    mask
}

pub fn load_file(path: &Path) -> EmuResult<EmuConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: EmuConfig = serde_json::from_str(&text)?;
    Ok(config)
}

impl EmuConfig {
    pub fn build(&self) -> EmuResult<Emulator> {
        let mut emu = Emulator::new();
        self.apply(&mut emu)?;
        Ok(emu)
    }

    pub fn apply(&self, emu: &mut Emulator) -> EmuResult<()> {
        emu.set_bmc_addr(self.bmc_addr)?;

        for mc_cfg in &self.mcs {
            emu.add_mc(
                mc_cfg.ipmb,
                mc_cfg.device_id,
                mc_cfg.has_device_sdrs,
                mc_cfg.device_revision,
                mc_cfg.major_fw_rev,
                mc_cfg.minor_fw_rev,
                mc_cfg.device_support,
                mc_cfg.mfg_id,
                mc_cfg.product_id,
                mc_cfg.dynamic_sensor_population,
            )?;

            let mc = emu.mc_mut(mc_cfg.ipmb)?;
            if let Some(sel) = &mc_cfg.sel {
                mc.enable_sel(sel.max_entries, sel.flags);
            }
            mc.set_main_sdr_support(mc_cfg.sdr_flags);
            for record in &mc_cfg.main_sdrs {
                mc.add_main_sdr(record)?;
            }
            for dev_sdr in &mc_cfg.device_sdrs {
                mc.add_device_sdr(dev_sdr.lun, &dev_sdr.data)?;
            }
            for fru in &mc_cfg.frus {
                mc.add_fru_data(fru.device_id, fru.length, &fru.data)?;
            }

            for sensor in &mc_cfg.sensors {
                mc.add_sensor(
                    sensor.lun,
                    sensor.num,
                    sensor.sensor_type,
                    sensor.event_reading_code,
                )?;
                if let Some(hyst) = &sensor.hysteresis {
                    mc.sensor_set_hysteresis(
                        sensor.lun,
                        sensor.num,
                        hyst.support,
                        hyst.positive,
                        hyst.negative,
                    )?;
                }
                if let Some(thr) = &sensor.thresholds {
                    mc.sensor_set_threshold(
                        sensor.lun,
                        sensor.num,
                        thr.support,
                        thr.supported,
                        thr.values,
                    )?;
                }
                if let Some(ev) = &sensor.events {
                    mc.sensor_set_event_support(
                        sensor.lun,
                        sensor.num,
                        ev.events_enabled,
                        ev.scanning_enabled,
                        ev.support,
                        [bit_mask(&ev.assert_supported), bit_mask(&ev.deassert_supported)],
                        [bit_mask(&ev.assert_enabled), bit_mask(&ev.deassert_enabled)],
                    )?;
                }
            }

            // Seed readings without generating events.
            for sensor in &mc_cfg.sensors {
                emu.sensor_set_value(mc_cfg.ipmb, sensor.lun, sensor.num, sensor.value, false)?;
            }
        }
        Ok(())
    }
}
