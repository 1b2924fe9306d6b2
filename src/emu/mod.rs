/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! The emulator domain: up to 128 MCs keyed by IPMB slave address, the
//! synchronous request entry point, SEND_MSG encapsulation and event
//! delivery between MCs.

pub mod dispatch;
pub mod fru;
pub mod mc;
pub mod sdr;
pub mod sel;
pub mod sensor;

pub use mc::{EventMsg, McData, OemRspHandler};
pub use sensor::Sensor;

use crate::error::{EmuError, EmuResult};
use crate::helper::ipmb_checksum;
use crate::ipmi::ipmi::*;
use dispatch::dispatch_to_mc;
use log::{debug, warn};

pub const NUM_IPMB_SLOTS: usize = 128;

/// IPMB NAK for encapsulated requests aimed at an empty slot.
pub const IPMB_NAK_ON_WRITE_CC: u8 = 0x83;

pub struct Emulator {
    bmc_ipmb: u8,
    mcs: [Option<Box<McData>>; NUM_IPMB_SLOTS],
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            bmc_ipmb: IPMI_BMC_SLAVE_ADDR,
            mcs: std::array::from_fn(|_| None),
        }
    }

    pub fn bmc_addr(&self) -> u8 {
        self.bmc_ipmb
    }

    pub fn set_bmc_addr(&mut self, ipmb: u8) -> EmuResult<()> {
        if ipmb & 1 != 0 {
            return Err(EmuError::InvalidParam(format!("odd IPMB address {:#04x}", ipmb)));
        }
        self.bmc_ipmb = ipmb;
        Ok(())
    }

    /// Register an MC at its IPMB slave address. Replacing a slot drops the
    /// previous MC together with its SEL, SDRs, FRUs and sensors.
    #[allow(clippy::too_many_arguments)]
    pub fn add_mc(
        &mut self,
        ipmb: u8,
        device_id: u8,
        has_device_sdrs: bool,
        device_revision: u8,
        major_fw_rev: u8,
        minor_fw_rev: u8,
        device_support: u8,
        mfg_id: [u8; 3],
        product_id: [u8; 2],
        dynamic_sensor_population: bool,
    ) -> EmuResult<()> {
        if ipmb & 1 != 0 {
            return Err(EmuError::InvalidParam(format!("odd IPMB address {:#04x}", ipmb)));
        }
        self.mcs[usize::from(ipmb >> 1)] = Some(Box::new(McData::new(
            ipmb,
            device_id,
            has_device_sdrs,
            device_revision,
            major_fw_rev,
            minor_fw_rev,
            device_support,
            mfg_id,
            product_id,
            dynamic_sensor_population,
        )));
        Ok(())
    }

    pub fn mc(&self, ipmb: u8) -> EmuResult<&McData> {
        if ipmb & 1 != 0 {
            return Err(EmuError::InvalidParam(format!("odd IPMB address {:#04x}", ipmb)));
        }
        self.mcs[usize::from(ipmb >> 1)]
            .as_deref()
            .ok_or(EmuError::NoSuchMc(ipmb))
    }

    pub fn mc_mut(&mut self, ipmb: u8) -> EmuResult<&mut McData> {
        if ipmb & 1 != 0 {
            return Err(EmuError::InvalidParam(format!("odd IPMB address {:#04x}", ipmb)));
        }
        self.mcs[usize::from(ipmb >> 1)]
            .as_deref_mut()
            .ok_or(EmuError::NoSuchMc(ipmb))
    }

    /// Push a new reading into a sensor, running threshold checks and
    /// delivering any resulting events before returning.
    pub fn sensor_set_value(
        &mut self,
        ipmb: u8,
        lun: u8,
        num: u8,
        value: u8,
        gen_event: bool,
    ) -> EmuResult<()> {
        let mut events = Vec::new();
        self.mc_mut(ipmb)?
            .sensor_set_value(lun, num, value, gen_event, &mut events)?;
        self.deliver_events(events);
        Ok(())
    }

    /// Flip a discrete event bit on a sensor.
    pub fn sensor_set_bit(
        &mut self,
        ipmb: u8,
        lun: u8,
        num: u8,
        bit: u8,
        value: bool,
        gen_event: bool,
    ) -> EmuResult<()> {
        let mut events = Vec::new();
        self.mc_mut(ipmb)?
            .sensor_set_bit(lun, num, bit, value, gen_event, &mut events)?;
        self.deliver_events(events);
        Ok(())
    }

    pub fn set_power(&mut self, ipmb: u8, power: u8, gen_event: bool) -> EmuResult<()> {
        let mut events = Vec::new();
        self.mc_mut(ipmb)?.set_power(power, gen_event, &mut events);
        self.deliver_events(events);
        Ok(())
    }

    /// The single protocol entry point: `request` is the raw payload
    /// `[netfn<<2|lun, cmd, data...]`, the return value starts with the
    /// completion code.
    pub fn handle_msg(&mut self, lun: u8, request: &[u8]) -> Vec<u8> {
        self.handle_msg_with_limit(lun, request, IPMI_BUF_SIZE)
    }

    /// Same as [`Self::handle_msg`] with an explicit response-size budget,
    /// for transports with smaller frames.
    pub fn handle_msg_with_limit(&mut self, lun: u8, request: &[u8], limit: usize) -> Vec<u8> {
        let (msg, _) = match IpmiMsg::parse(request) {
            Some(parsed) => parsed,
            None => return vec![IPMI_CC_REQ_DATA_INV_LENGTH],
        };

        if msg.netfn == IPMI_NETFN_APP && msg.cmd == IPMI_CMD_SEND_MSG {
            return self.handle_send_msg(&msg, limit);
        }

        let slot = usize::from(self.bmc_ipmb >> 1);
        let mut events = Vec::new();
        let mut consumed = false;
        let rsp = match self.mcs[slot].as_deref_mut() {
            Some(bmc) => {
                let rsp = dispatch_to_mc(bmc, lun, &msg, limit, &mut events);
                if let Some(hook) = bmc.oem_handle_rsp {
                    consumed = hook(msg.netfn, msg.cmd, &rsp);
                }
                rsp
            }
            None => return vec![IPMI_CC_UNSPECIFIED_ERROR],
        };
        self.deliver_events(events);
        if consumed {
            return Vec::new();
        }
        rsp
    }

    /// Encapsulated IPMB: unwrap the frame, run the inner request against the
    /// addressed MC and wrap the answer in an IPMB response frame.
    fn handle_send_msg(&mut self, msg: &IpmiMsg, limit: usize) -> Vec<u8> {
        if msg.data.len() < 8 {
            return vec![IPMI_CC_REQ_DATA_INV_LENGTH];
        }
        // Low six bits of the channel byte must name channel 0.
        if msg.data[0] & 0x3f != 0 {
            return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
        }

        let mut frame = &msg.data[1..];
        if frame[0] == 0 {
            // Broadcast: skip the extra leading byte.
            frame = &frame[1..];
            if frame.len() < 7 {
                return vec![IPMI_CC_REQ_DATA_INV_LENGTH];
            }
        }

        let slave = frame[0];
        let netfn_lun = frame[1];
        let rq_seq = frame[4];
        let cmd = frame[5];
        let inner = IpmiMsg::new(netfn_lun >> 2, cmd, &frame[6..frame.len() - 1]);
        let lun = netfn_lun & 0x3;

        let mut events = Vec::new();
        let mut consumed = false;
        let inner_rsp = match self.mcs[usize::from(slave >> 1)].as_deref_mut() {
            Some(dest) => {
                let rsp = dispatch_to_mc(dest, lun, &inner, limit, &mut events);
                if let Some(hook) = dest.oem_handle_rsp {
                    consumed = hook(inner.netfn, inner.cmd, &rsp);
                }
                rsp
            }
            None => return vec![IPMB_NAK_ON_WRITE_CC],
        };
        self.deliver_events(events);
        if consumed {
            return Vec::new();
        }

        let mut rsp = Vec::with_capacity(inner_rsp.len() + 8);
        rsp.push(0);
        rsp.push(self.bmc_ipmb);
        rsp.push(((inner.netfn | 1) << 2) | (rq_seq & 0x3));
        rsp.push(ipmb_checksum(&rsp[1..3], 0));
        rsp.push(slave);
        rsp.push((rq_seq & 0xfc) | (netfn_lun & 0x03));
        rsp.push(cmd);
        rsp.extend_from_slice(&inner_rsp);
        let csum = ipmb_checksum(&rsp, 0);
        rsp.push(csum);
        rsp
    }

    /// Hand queued events to their receivers' SELs. A missing receiver or a
    /// full log drops the event without failing the originating call.
    fn deliver_events(&mut self, events: Vec<EventMsg>) {
        for ev in events {
            match self.mcs[usize::from(ev.dest >> 1)].as_deref_mut() {
                Some(dest) => {
                    if let Err(err) = dest.add_to_sel(ev.record_type, &ev.data) {
                        warn!("event for 0x{:02x} dropped: {}", ev.dest, err);
                    }
                }
                None => debug!("event receiver 0x{:02x} absent, event dropped", ev.dest),
            }
        }
    }
}
