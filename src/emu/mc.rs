/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! The management-controller model: device identity, the four repositories,
//! the sensor table and the per-MC pieces of the configuration API.

use std::collections::HashMap;

use crate::emu::sdr::{PartialAdd, Sdrs};
use crate::emu::sel::Sel;
use crate::emu::sensor::{check_thresholds, set_bit, Sensor, NUM_EVENT_BITS};
use crate::error::{EmuError, EmuResult};
use crate::helper::wall_clock_secs;
use crate::ipmi::ipmi::*;

// Device ID support bits
pub const IPMI_DEVID_SENSOR_DEV: u8 = 1 << 0;
pub const IPMI_DEVID_SDR_REPOSITORY_DEV: u8 = 1 << 1;
pub const IPMI_DEVID_SEL_DEVICE: u8 = 1 << 2;
pub const IPMI_DEVID_FRU_INVENTORY_DEV: u8 = 1 << 3;
pub const IPMI_DEVID_IPMB_EVENT_RCV: u8 = 1 << 4;
pub const IPMI_DEVID_IPMB_EVENT_GEN: u8 = 1 << 5;
pub const IPMI_DEVID_BRIDGE: u8 = 1 << 6;
pub const IPMI_DEVID_CHASSIS_DEVICE: u8 = 1 << 7;

pub const OEM0_CMD_SET_POWER: u8 = 0x01;
pub const OEM0_CMD_GET_POWER: u8 = 0x02;

/// Record type of the control-style OEM event logged on power changes.
pub const POWER_EVENT_RECORD_TYPE: u8 = 0xc0;

/// Slave addresses carry the r/w bit in bit 0 and are always even.
pub const IPMB_SLAVE_ADDR_MASK: u8 = 0xfe;

/// An event on its way to the SEL of the MC at `dest`. Queued by the handler
/// that caused it and delivered by the emulator before the call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMsg {
    pub dest: u8,
    pub record_type: u8,
    pub data: [u8; 13],
}

/// The identity an event carries: who generated it and where it goes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventSource {
    pub ipmb: u8,
    pub event_receiver: u8,
}

/// Optional hook inspecting a finished response; returning true consumes it
/// and the dispatcher produces no bytes.
pub type OemRspHandler = fn(netfn: u8, cmd: u8, rsp: &[u8]) -> bool;

pub struct McData {
    pub(crate) ipmb: u8,

    // Get Device Id contents.
    pub(crate) device_id: u8,
    pub(crate) has_device_sdrs: bool,
    pub(crate) device_revision: u8,
    pub(crate) major_fw_rev: u8,
    pub(crate) minor_fw_rev: u8,
    pub(crate) device_support: u8,
    pub(crate) mfg_id: [u8; 3],
    pub(crate) product_id: [u8; 2],

    pub(crate) sel: Sel,
    pub(crate) main_sdrs: Sdrs,
    pub(crate) device_sdrs: [Sdrs; 4],
    pub(crate) part_add: Option<PartialAdd>,
    pub(crate) in_update_mode: bool,

    pub(crate) event_receiver: u8,
    pub(crate) event_receiver_lun: u8,

    pub(crate) dynamic_sensor_population: bool,
    pub(crate) lun_has_sensors: [bool; 4],
    pub(crate) num_sensors_per_lun: [u8; 4],
    pub(crate) sensor_population_change_time: u32,
    pub(crate) sensors: [HashMap<u8, Sensor>; 4],

    pub(crate) frus: HashMap<u8, Vec<u8>>,
    pub(crate) power_value: u8,

    pub oem_handle_rsp: Option<OemRspHandler>,
}

impl McData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
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
    ) -> Self {
        // Repository clocks start at zero, not at the host epoch.
        let time_offset = -wall_clock_secs();
        Self {
            ipmb,
            device_id,
            has_device_sdrs,
            device_revision,
            major_fw_rev,
            minor_fw_rev,
            device_support,
            mfg_id,
            product_id,
            sel: Sel::new(time_offset),
            main_sdrs: Sdrs::new(time_offset),
            device_sdrs: std::array::from_fn(|_| Sdrs::new(time_offset)),
            part_add: None,
            in_update_mode: false,
            event_receiver: IPMI_BMC_SLAVE_ADDR,
            event_receiver_lun: 0,
            dynamic_sensor_population,
            lun_has_sensors: [false; 4],
            num_sensors_per_lun: [0; 4],
            sensor_population_change_time: 0,
            sensors: std::array::from_fn(|_| HashMap::new()),
            frus: HashMap::new(),
            power_value: 0,
            oem_handle_rsp: None,
        }
    }

    pub fn ipmb(&self) -> u8 {
        self.ipmb
    }

    pub fn sel(&self) -> &Sel {
        &self.sel
    }

    pub fn main_sdrs(&self) -> &Sdrs {
        &self.main_sdrs
    }

    pub(crate) fn event_source(&self) -> EventSource {
        EventSource {
            ipmb: self.ipmb,
            event_receiver: self.event_receiver,
        }
    }

    /// Feed an event record into this MC's SEL; the timestamp rewrite and
    /// record-id allocation happen inside the log.
    pub fn add_to_sel(&mut self, record_type: u8, event: &[u8; 13]) -> EmuResult<u16> {
        if self.device_support & IPMI_DEVID_SEL_DEVICE == 0 {
            return Err(EmuError::NotSupported("SEL device".into()));
        }
        self.sel.add(record_type, event)
    }

    /*
     * Configuration API, driven by the external loader.
     */

    pub fn enable_sel(&mut self, max_entries: usize, flags: u8) {
        self.sel.enable(max_entries, flags);
    }

    pub fn set_main_sdr_support(&mut self, flags: u8) {
        self.main_sdrs.set_flags(flags);
    }

    pub fn add_main_sdr(&mut self, data: &[u8]) -> EmuResult<u16> {
        if self.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
            return Err(EmuError::NotSupported("SDR repository device".into()));
        }
        self.main_sdrs.add_record(data)
    }

    pub fn add_device_sdr(&mut self, lun: u8, data: &[u8]) -> EmuResult<u16> {
        if lun >= 4 {
            return Err(EmuError::InvalidParam(format!("LUN {}", lun)));
        }
        if !self.has_device_sdrs {
            return Err(EmuError::NotSupported("device SDRs".into()));
        }

        let lun = usize::from(lun);
        let record_id = self.device_sdrs[lun].add_record(data)?;
        self.sensor_population_change_time = self.main_sdrs.time();
        self.lun_has_sensors[lun] = true;
        self.num_sensors_per_lun[lun] = self.num_sensors_per_lun[lun].saturating_add(1);
        Ok(record_id)
    }

    pub fn add_fru_data(&mut self, device_id: u8, length: usize, data: &[u8]) -> EmuResult<()> {
        if self.device_support & IPMI_DEVID_FRU_INVENTORY_DEV == 0 {
            return Err(EmuError::NotSupported("FRU inventory device".into()));
        }
        if device_id == 0xff {
            return Err(EmuError::InvalidParam("FRU device id 255".into()));
        }
        if data.len() > length {
            return Err(EmuError::InvalidParam(format!(
                "FRU data {} exceeds area length {}",
                data.len(),
                length
            )));
        }

        let mut area = vec![0u8; length];
        area[..data.len()].copy_from_slice(data);
        self.frus.insert(device_id, area);
        Ok(())
    }

    pub fn add_sensor(
        &mut self,
        lun: u8,
        num: u8,
        sensor_type: u8,
        event_reading_code: u8,
    ) -> EmuResult<()> {
        if lun >= 4 || num == 0xff {
            return Err(EmuError::InvalidParam(format!("sensor {}/{}", lun, num)));
        }
        let table = &mut self.sensors[usize::from(lun)];
        if table.contains_key(&num) {
            return Err(EmuError::InvalidParam(format!(
                "sensor {}/{} already present",
                lun, num
            )));
        }
        table.insert(num, Sensor::new(lun, num, sensor_type, event_reading_code));
        Ok(())
    }

    fn sensor_mut(&mut self, lun: u8, num: u8) -> EmuResult<&mut Sensor> {
        if lun >= 4 || num == 0xff {
            return Err(EmuError::NoSuchSensor(lun, num));
        }
        self.sensors[usize::from(lun)]
            .get_mut(&num)
            .ok_or(EmuError::NoSuchSensor(lun, num))
    }

    pub fn sensor_set_hysteresis(
        &mut self,
        lun: u8,
        num: u8,
        support: u8,
        positive: u8,
        negative: u8,
    ) -> EmuResult<()> {
        let sensor = self.sensor_mut(lun, num)?;
        sensor.hysteresis_support = support;
        sensor.positive_hysteresis = positive;
        sensor.negative_hysteresis = negative;
        Ok(())
    }

    pub fn sensor_set_threshold(
        &mut self,
        lun: u8,
        num: u8,
        support: u8,
        supported: [bool; 6],
        values: [u8; 6],
    ) -> EmuResult<()> {
        let sensor = self.sensor_mut(lun, num)?;
        sensor.threshold_support = support;
        sensor.threshold_supported = supported;
        sensor.thresholds = values;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn sensor_set_event_support(
        &mut self,
        lun: u8,
        num: u8,
        events_enabled: bool,
        scanning: bool,
        support: u8,
        supported: [[bool; NUM_EVENT_BITS]; 2],
        enabled: [[bool; NUM_EVENT_BITS]; 2],
    ) -> EmuResult<()> {
        let sensor = self.sensor_mut(lun, num)?;
        sensor.events_enabled = events_enabled;
        sensor.scanning_enabled = scanning;
        sensor.event_support = support;
        sensor.event_supported = supported;
        sensor.event_enabled = enabled;
        Ok(())
    }

    pub(crate) fn sensor_set_value(
        &mut self,
        lun: u8,
        num: u8,
        value: u8,
        gen_event: bool,
        events: &mut Vec<EventMsg>,
    ) -> EmuResult<()> {
        let src = self.event_source();
        let sensor = self.sensor_mut(lun, num)?;
        sensor.value = value;
        check_thresholds(&src, sensor, gen_event, events);
        Ok(())
    }

    pub(crate) fn sensor_set_bit(
        &mut self,
        lun: u8,
        num: u8,
        bit: u8,
        value: bool,
        gen_event: bool,
        events: &mut Vec<EventMsg>,
    ) -> EmuResult<()> {
        if usize::from(bit) >= NUM_EVENT_BITS {
            return Err(EmuError::InvalidParam(format!("event bit {}", bit)));
        }
        let src = self.event_source();
        let sensor = self.sensor_mut(lun, num)?;
        set_bit(&src, sensor, bit, value, gen_event, events);
        Ok(())
    }

    /// Change the stored power value; a real change with event generation on
    /// logs a control-style OEM record at the event receiver.
    pub(crate) fn set_power(&mut self, power: u8, gen_event: bool, events: &mut Vec<EventMsg>) {
        if self.power_value == power {
            return;
        }
        self.power_value = power;

        if !gen_event || self.event_receiver == 0 {
            return;
        }

        let mut data = [0u8; 13];
        data[4] = IPMI_BMC_SLAVE_ADDR;
        data[6] = 0x01; // version 1
        data[8] = 0; // control number 0
        data[10] = power;
        events.push(EventMsg {
            dest: self.event_receiver,
            record_type: POWER_EVENT_RECORD_TYPE,
            data,
        });
    }
}

pub(crate) fn short_msg(msg: &IpmiMsg, len: usize) -> Option<Vec<u8>> {
    (msg.data.len() < len).then(|| vec![IPMI_CC_REQ_DATA_INV_LENGTH])
}

/// Get Device ID is answered no matter what the support byte advertises.
pub(crate) fn handle_get_device_id(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    let mut rsp = vec![0u8; 12];
    rsp[1] = mc.device_id;
    rsp[2] = (u8::from(mc.has_device_sdrs) << 7) | (mc.device_revision & 0x0f);
    rsp[3] = mc.major_fw_rev & 0x7f;
    rsp[4] = mc.minor_fw_rev;
    rsp[5] = 0x51;
    rsp[6] = mc.device_support;
    rsp[7..10].copy_from_slice(&mc.mfg_id);
    rsp[10..12].copy_from_slice(&mc.product_id);
    rsp
}

pub(crate) fn handle_get_event_receiver(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_IPMB_EVENT_GEN == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    vec![0, mc.event_receiver, mc.event_receiver_lun & 0x3]
}

pub(crate) fn handle_set_event_receiver(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_IPMB_EVENT_GEN == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if let Some(rsp) = short_msg(msg, 2) {
        return rsp;
    }

    mc.event_receiver = msg.data[0] & IPMB_SLAVE_ADDR_MASK;
    mc.event_receiver_lun = msg.data[1] & 0x3;
    vec![0]
}

pub(crate) fn handle_set_power(
    mc: &mut McData,
    msg: &IpmiMsg,
    events: &mut Vec<EventMsg>,
) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }
    mc.set_power(msg.data[0], true, events);
    vec![0]
}

pub(crate) fn handle_get_power(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    vec![0, mc.power_value]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mc() -> McData {
        McData::new(
            0x20, 0x20, true, 0x01, 2, 0, 0xbf, [0x12, 0x34, 0x56], [0x78, 0x9a], false,
        )
    }

    fn msg<'a>(netfn: u8, cmd: u8, data: &'a [u8]) -> IpmiMsg<'a> {
        IpmiMsg::new(netfn, cmd, data)
    }

    #[test]
    fn test_get_device_id_layout() {
        let mut mc = test_mc();
        let rsp = handle_get_device_id(&mut mc, &msg(IPMI_NETFN_APP, BMC_GET_DEVICE_ID, &[]));
        assert_eq!(
            rsp,
            vec![0x00, 0x20, 0x81, 0x02, 0x00, 0x51, 0xbf, 0x12, 0x34, 0x56, 0x78, 0x9a]
        );
    }

    #[test]
    fn test_device_id_ignores_support_byte() {
        let mut mc = McData::new(0x20, 1, false, 1, 1, 1, 0x00, [0; 3], [0; 2], false);
        let rsp = handle_get_device_id(&mut mc, &msg(IPMI_NETFN_APP, BMC_GET_DEVICE_ID, &[]));
        assert_eq!(rsp[0], 0);
        assert_eq!(rsp.len(), 12);
    }

    #[test]
    fn test_event_receiver_masks() {
        let mut mc = test_mc();
        let rsp = handle_set_event_receiver(&mut mc, &msg(IPMI_NETFN_SE, 0x00, &[0x83, 0x07]));
        assert_eq!(rsp, vec![0]);
        let rsp = handle_get_event_receiver(&mut mc, &msg(IPMI_NETFN_SE, 0x01, &[]));
        assert_eq!(rsp, vec![0, 0x82, 0x03]);
    }

    #[test]
    fn test_event_receiver_requires_generator_support() {
        let mut mc = McData::new(0x20, 1, false, 1, 1, 1, 0x1f, [0; 3], [0; 2], false);
        let rsp = handle_get_event_receiver(&mut mc, &msg(IPMI_NETFN_SE, 0x01, &[]));
        assert_eq!(rsp, vec![IPMI_CC_INV_CMD]);
    }

    #[test]
    fn test_set_power_event_payload() {
        let mut mc = test_mc();
        let mut events = Vec::new();
        let rsp = handle_set_power(&mut mc, &msg(IPMI_NETFN_OEM0, OEM0_CMD_SET_POWER, &[1]), &mut events);
        assert_eq!(rsp, vec![0]);
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.record_type, POWER_EVENT_RECORD_TYPE);
        assert_eq!(ev.dest, 0x20);
        assert_eq!(ev.data[4], 0x20);
        assert_eq!(ev.data[6], 0x01);
        assert_eq!(ev.data[10], 1);

        // Unchanged value does not log again.
        let rsp = handle_set_power(&mut mc, &msg(IPMI_NETFN_OEM0, OEM0_CMD_SET_POWER, &[1]), &mut events);
        assert_eq!(rsp, vec![0]);
        assert_eq!(events.len(), 1);

        let rsp = handle_get_power(&mut mc, &msg(IPMI_NETFN_OEM0, OEM0_CMD_GET_POWER, &[]));
        assert_eq!(rsp, vec![0, 1]);
    }

    #[test]
    fn test_set_power_without_receiver() {
        let mut mc = test_mc();
        mc.event_receiver = 0;
        let mut events = Vec::new();
        mc.set_power(5, true, &mut events);
        assert_eq!(mc.power_value, 5);
        assert!(events.is_empty());
    }

    #[test]
    fn test_add_sensor_validation() {
        let mut mc = test_mc();
        mc.add_sensor(0, 1, 0x01, 0x01).unwrap();
        assert!(mc.add_sensor(0, 1, 0x01, 0x01).is_err());
        assert!(mc.add_sensor(4, 2, 0x01, 0x01).is_err());
        assert!(mc.add_sensor(0, 255, 0x01, 0x01).is_err());
    }

    #[test]
    fn test_sensor_set_bit_bounds() {
        let mut mc = test_mc();
        mc.add_sensor(0, 1, 0x01, 0x6f).unwrap();
        let mut events = Vec::new();
        assert!(mc.sensor_set_bit(0, 1, 15, true, true, &mut events).is_err());
        assert!(mc.sensor_set_bit(0, 1, 3, true, true, &mut events).is_ok());
        assert!(mc.sensors[0][&1].event_status[3]);
    }

    #[test]
    fn test_add_to_sel_requires_support() {
        let mut mc = McData::new(0x20, 1, false, 1, 1, 1, 0x01, [0; 3], [0; 2], false);
        assert!(mc.add_to_sel(0x02, &[0; 13]).is_err());
    }

    #[test]
    fn test_add_device_sdr_population_bookkeeping() {
        let mut mc = test_mc();
        let mut rec = vec![0u8; 10];
        rec[5] = 4;
        mc.add_device_sdr(2, &rec).unwrap();
        assert!(mc.lun_has_sensors[2]);
        assert_eq!(mc.num_sensors_per_lun[2], 1);

        assert!(mc.add_device_sdr(4, &rec).is_err());
        let mut plain = McData::new(0x20, 1, false, 1, 1, 1, 0xbf, [0; 3], [0; 2], false);
        assert!(plain.add_device_sdr(0, &rec).is_err());
    }
}
