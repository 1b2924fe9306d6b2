/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! Sensor Data Record repositories: variable-length records with
//! reservations, modal update gating and multi-packet partial adds. The same
//! store backs the main repository and the four per-LUN device repositories.

use crate::emu::mc::{
    short_msg, McData, IPMI_DEVID_SDR_REPOSITORY_DEV, IPMI_DEVID_SENSOR_DEV,
};
use crate::error::{EmuError, EmuResult};
use crate::helper::{get_uint16_le, get_uint32_le, set_uint16_le, set_uint32_le, wall_clock_secs};
use crate::ipmi::ipmi::*;

pub const IPMI_CMD_GET_SDR_REPO_INFO: u8 = 0x20;
pub const IPMI_CMD_GET_SDR_ALLOC_INFO: u8 = 0x21;
pub const IPMI_CMD_RESERVE_SDR_REPO: u8 = 0x22;
pub const IPMI_CMD_GET_SDR: u8 = 0x23;
pub const IPMI_CMD_ADD_SDR: u8 = 0x24;
pub const IPMI_CMD_PARTIAL_ADD_SDR: u8 = 0x25;
pub const IPMI_CMD_DELETE_SDR: u8 = 0x26;
pub const IPMI_CMD_CLEAR_SDR_REPO: u8 = 0x27;
pub const IPMI_CMD_GET_SDR_REPO_TIME: u8 = 0x28;
pub const IPMI_CMD_SET_SDR_REPO_TIME: u8 = 0x29;
pub const IPMI_CMD_ENTER_SDR_REPO_UPDATE: u8 = 0x2a;
pub const IPMI_CMD_EXIT_SDR_REPO_UPDATE: u8 = 0x2b;

pub const IPMI_SDR_GET_ALLOC_INFO_SUPPORTED: u8 = 1 << 0;
pub const IPMI_SDR_RESERVE_SUPPORTED: u8 = 1 << 1;
pub const IPMI_SDR_PARTIAL_ADD_SUPPORTED: u8 = 1 << 2;
pub const IPMI_SDR_DELETE_SUPPORTED: u8 = 1 << 3;

// Modal capability field, flags bits 5-6.
pub const IPMI_SDR_MODAL_UNSPECIFIED: u8 = 0;
pub const IPMI_SDR_NON_MODAL_ONLY: u8 = 1;
pub const IPMI_SDR_MODAL_ONLY: u8 = 2;
pub const IPMI_SDR_MODAL_BOTH: u8 = 3;

pub fn sdr_modal(flags: u8) -> u8 {
    (flags >> 5) & 0x3
}

pub const SDR_HEADER_LEN: usize = 6;
pub const MAX_SDR_LENGTH: usize = 261;
pub const MAX_NUM_SDRS: usize = 1024;

/// Command-specific completion code for add/partial-add length problems.
pub const SDR_LENGTH_INVALID_CC: u8 = 0x80;

#[derive(Debug, Clone)]
pub struct SdrRecord {
    pub record_id: u16,
    pub data: Vec<u8>,
}

/// An in-flight multi-packet add: the pre-allocated record plus the strict
/// next-offset watermark.
#[derive(Debug)]
pub struct PartialAdd {
    pub(crate) record: SdrRecord,
    pub(crate) next: usize,
}

#[derive(Debug, Default)]
pub struct Sdrs {
    records: Vec<SdrRecord>,
    reservation: u16,
    next_entry: u16,
    last_add_time: u32,
    last_erase_time: u32,
    time_offset: i64,
    flags: u8,
}

impl Sdrs {
    pub fn new(time_offset: i64) -> Self {
        Self {
            next_entry: 1,
            time_offset,
            ..Default::default()
        }
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[SdrRecord] {
        &self.records
    }

    pub fn time(&self) -> u32 {
        (wall_clock_secs() + self.time_offset) as u32
    }

    pub fn set_time(&mut self, secs: u32) {
        self.time_offset = i64::from(secs) - wall_clock_secs();
    }

    pub fn reserve(&mut self) -> u16 {
        self.reservation = self.reservation.wrapping_add(1);
        if self.reservation == 0 {
            self.reservation = 1;
        }
        self.reservation
    }

    fn reservation_ok(&self, supplied: u16) -> bool {
        supplied == 0 || supplied == self.reservation
    }

    fn locate(&self, record_id: u16) -> Option<usize> {
        match record_id {
            0 => (!self.records.is_empty()).then_some(0),
            0xffff => self.records.len().checked_sub(1),
            id => self.records.iter().position(|e| e.record_id == id),
        }
    }

    /// Record ids 0x0000 and 0xffff carry list-navigation meaning on the wire
    /// and are never allocated.
    fn alloc_record_id(&mut self) -> Option<u16> {
        for _ in 0..=usize::from(u16::MAX) {
            let id = self.next_entry;
            self.next_entry = self.next_entry.wrapping_add(1);
            if id == 0 || id == 0xffff {
                continue;
            }
            if self.records.iter().all(|e| e.record_id != id) {
                return Some(id);
            }
        }
        None
    }

    /// Reserve an id and a zero-filled record of `body_len` + header bytes,
    /// with the id already stamped into the first two bytes.
    fn alloc_record(&mut self, body_len: usize) -> Option<SdrRecord> {
        let record_id = self.alloc_record_id()?;
        let mut data = vec![0u8; body_len + SDR_HEADER_LEN];
        set_uint16_le(&mut data, record_id);
        Some(SdrRecord { record_id, data })
    }

    fn insert(&mut self, record: SdrRecord) {
        self.records.push(record);
        self.last_add_time = self.time();
    }

    /// Configuration-API add: `data` is a complete record; its first two
    /// bytes are replaced with the allocated id.
    pub fn add_record(&mut self, data: &[u8]) -> EmuResult<u16> {
        if data.len() < SDR_HEADER_LEN || data.len() > MAX_SDR_LENGTH {
            return Err(EmuError::InvalidParam(format!(
                "SDR record length {}",
                data.len()
            )));
        }
        let record_id = self.alloc_record_id().ok_or(EmuError::OutOfSpace)?;
        let mut rec = data.to_vec();
        set_uint16_le(&mut rec, record_id);
        self.insert(SdrRecord {
            record_id,
            data: rec,
        });
        Ok(record_id)
    }
}

/// Shared body of Get SDR and Get Device SDR.
fn read_record(sdrs: &Sdrs, msg: &IpmiMsg, limit: usize, check_reservation: bool) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 6) {
        return rsp;
    }
    let d = msg.data;
    if check_reservation && !sdrs.reservation_ok(get_uint16_le(d)) {
        return vec![IPMI_CC_RES_CANCELED];
    }

    let record_id = get_uint16_le(&d[2..]);
    let offset = usize::from(d[4]);
    let count = usize::from(d[5]);

    let idx = match sdrs.locate(record_id) {
        Some(idx) => idx,
        None => return vec![IPMI_CC_REQ_DATA_NOT_PRESENT],
    };
    let entry = &sdrs.records[idx];

    if offset >= entry.data.len() {
        return vec![IPMI_CC_PARAM_OUT_OF_RANGE];
    }
    let count = count.min(entry.data.len() - offset);
    if count + 3 > limit {
        return vec![IPMI_CC_CANT_RET_NUM_REQ_BYTES];
    }

    let next_id = sdrs.records.get(idx + 1).map_or(0xffff, |e| e.record_id);
    let mut rsp = vec![0u8; 3];
    set_uint16_le(&mut rsp[1..], next_id);
    rsp.extend_from_slice(&entry.data[offset..offset + count]);
    rsp
}

pub(crate) fn handle_get_sdr_repo_info(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }

    let sdrs = &mc.main_sdrs;
    let space = (MAX_SDR_LENGTH * MAX_NUM_SDRS.saturating_sub(sdrs.count())).min(0xfffe);

    let mut rsp = vec![0u8; 15];
    rsp[1] = 0x51;
    set_uint16_le(&mut rsp[2..], sdrs.count() as u16);
    set_uint16_le(&mut rsp[4..], space as u16);
    set_uint32_le(&mut rsp[6..], sdrs.last_add_time);
    set_uint32_le(&mut rsp[10..], sdrs.last_erase_time);
    rsp[14] = sdrs.flags;
    rsp
}

pub(crate) fn handle_get_sdr_alloc_info(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if mc.main_sdrs.flags & IPMI_SDR_GET_ALLOC_INFO_SUPPORTED == 0 {
        return vec![IPMI_CC_INV_CMD];
    }

    let free = (MAX_NUM_SDRS.saturating_sub(mc.main_sdrs.count())) as u16;
    let mut rsp = vec![0u8; 10];
    set_uint16_le(&mut rsp[1..], MAX_NUM_SDRS as u16);
    set_uint16_le(&mut rsp[3..], MAX_SDR_LENGTH as u16);
    set_uint16_le(&mut rsp[5..], free);
    set_uint16_le(&mut rsp[7..], free);
    rsp[9] = 1;
    rsp
}

pub(crate) fn handle_reserve_sdr_repo(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if mc.main_sdrs.flags & IPMI_SDR_RESERVE_SUPPORTED == 0 {
        return vec![IPMI_CC_INV_CMD];
    }

    let reservation = mc.main_sdrs.reserve();

    // A new reservation invalidates any partial add in flight.
    mc.part_add = None;

    let mut rsp = vec![0u8; 3];
    set_uint16_le(&mut rsp[1..], reservation);
    rsp
}

pub(crate) fn handle_get_sdr(mc: &mut McData, msg: &IpmiMsg, limit: usize) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    let check = mc.main_sdrs.flags & IPMI_SDR_RESERVE_SUPPORTED != 0;
    read_record(&mc.main_sdrs, msg, limit, check)
}

pub(crate) fn handle_add_sdr(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if sdr_modal(mc.main_sdrs.flags) == IPMI_SDR_NON_MODAL_ONLY && !mc.in_update_mode {
        return vec![IPMI_CC_NOT_SUPPORTED_PRESENT_STATE];
    }
    if let Some(rsp) = short_msg(msg, 6) {
        return rsp;
    }

    let d = msg.data;
    if d.len() != usize::from(d[5]) + SDR_HEADER_LEN {
        return vec![SDR_LENGTH_INVALID_CC];
    }

    let mut record = match mc.main_sdrs.alloc_record(usize::from(d[5])) {
        Some(record) => record,
        None => return vec![IPMI_CC_OUT_OF_SPACE],
    };
    record.data[2..].copy_from_slice(&d[2..]);
    let record_id = record.record_id;
    mc.main_sdrs.insert(record);

    let mut rsp = vec![0u8; 3];
    set_uint16_le(&mut rsp[1..], record_id);
    rsp
}

pub(crate) fn handle_partial_add_sdr(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if mc.main_sdrs.flags & IPMI_SDR_PARTIAL_ADD_SUPPORTED == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if let Some(rsp) = short_msg(msg, 6) {
        return rsp;
    }

    let d = msg.data;
    if mc.main_sdrs.flags & IPMI_SDR_RESERVE_SUPPORTED != 0
        && !mc.main_sdrs.reservation_ok(get_uint16_le(d))
    {
        return vec![IPMI_CC_RES_CANCELED];
    }
    if sdr_modal(mc.main_sdrs.flags) == IPMI_SDR_NON_MODAL_ONLY && !mc.in_update_mode {
        return vec![IPMI_CC_NOT_SUPPORTED_PRESENT_STATE];
    }

    let record_id = get_uint16_le(&d[2..]);
    let offset = usize::from(d[4]);
    let progress = d[5];

    if record_id == 0 {
        // First packet of a new record.
        if let Some(rsp) = short_msg(msg, 12) {
            return rsp;
        }
        if offset != 0 {
            return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
        }
        if d.len() > usize::from(d[11]) + 12 {
            return vec![SDR_LENGTH_INVALID_CC];
        }
        if mc.part_add.is_some() {
            // A previous add never finished; drop it and complain.
            mc.part_add = None;
            return vec![IPMI_CC_UNSPECIFIED_ERROR];
        }
        let mut record = match mc.main_sdrs.alloc_record(usize::from(d[11])) {
            Some(record) => record,
            None => return vec![IPMI_CC_OUT_OF_SPACE],
        };
        let body = &d[6..];
        record.data[2..body.len()].copy_from_slice(&body[2..]);
        mc.part_add = Some(PartialAdd {
            record,
            next: body.len(),
        });
    } else {
        let (next, capacity) = match mc.part_add.as_ref() {
            Some(part) => (part.next, part.record.data.len()),
            None => return vec![IPMI_CC_UNSPECIFIED_ERROR],
        };
        let body = &d[6..];
        // Offsets are strict: any gap or overlap aborts the add.
        if offset != next {
            mc.part_add = None;
            return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
        }
        if offset + body.len() > capacity {
            mc.part_add = None;
            return vec![SDR_LENGTH_INVALID_CC];
        }
        if let Some(part) = mc.part_add.as_mut() {
            part.record.data[offset..offset + body.len()].copy_from_slice(body);
            part.next += body.len();
        }
    }

    if progress & 0x0f == 1 {
        // Last packet: the byte count must land exactly on the declared total.
        match mc.part_add.take() {
            Some(part) if part.next == part.record.data.len() => {
                let record_id = part.record.record_id;
                mc.main_sdrs.insert(part.record);
                let mut rsp = vec![0u8; 3];
                set_uint16_le(&mut rsp[1..], record_id);
                rsp
            }
            _ => vec![SDR_LENGTH_INVALID_CC],
        }
    } else {
        let record_id = mc
            .part_add
            .as_ref()
            .map_or(0, |part| part.record.record_id);
        let mut rsp = vec![0u8; 3];
        set_uint16_le(&mut rsp[1..], record_id);
        rsp
    }
}

pub(crate) fn handle_delete_sdr(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if mc.main_sdrs.flags & IPMI_SDR_DELETE_SUPPORTED == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if let Some(rsp) = short_msg(msg, 4) {
        return rsp;
    }

    let d = msg.data;
    if mc.main_sdrs.flags & IPMI_SDR_RESERVE_SUPPORTED != 0
        && !mc.main_sdrs.reservation_ok(get_uint16_le(d))
    {
        return vec![IPMI_CC_RES_CANCELED];
    }

    let record_id = get_uint16_le(&d[2..]);
    let idx = match mc.main_sdrs.locate(record_id) {
        Some(idx) => idx,
        None => return vec![IPMI_CC_REQ_DATA_NOT_PRESENT],
    };

    let removed = mc.main_sdrs.records.remove(idx);
    mc.main_sdrs.last_erase_time = mc.main_sdrs.time();

    let mut rsp = vec![0u8; 3];
    set_uint16_le(&mut rsp[1..], removed.record_id);
    rsp
}

pub(crate) fn handle_clear_sdr_repo(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if let Some(rsp) = short_msg(msg, 6) {
        return rsp;
    }

    let d = msg.data;
    if mc.main_sdrs.flags & IPMI_SDR_RESERVE_SUPPORTED != 0
        && !mc.main_sdrs.reservation_ok(get_uint16_le(d))
    {
        return vec![IPMI_CC_RES_CANCELED];
    }

    if &d[2..5] != b"CLR" {
        return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
    }
    let op = d[5];
    if op != 0x00 && op != 0xaa {
        return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
    }

    if op == 0x00 {
        mc.main_sdrs.records.clear();
    }
    mc.main_sdrs.last_erase_time = mc.main_sdrs.time();

    vec![0, 0x01]
}

pub(crate) fn handle_get_sdr_repo_time(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    let mut rsp = vec![0u8; 5];
    set_uint32_le(&mut rsp[1..], mc.main_sdrs.time());
    rsp
}

pub(crate) fn handle_set_sdr_repo_time(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if let Some(rsp) = short_msg(msg, 4) {
        return rsp;
    }
    mc.main_sdrs.set_time(get_uint32_le(msg.data));
    vec![0]
}

fn modal_capable(flags: u8) -> bool {
    matches!(sdr_modal(flags), IPMI_SDR_MODAL_ONLY | IPMI_SDR_MODAL_BOTH)
}

pub(crate) fn handle_enter_sdr_repo_update(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if !modal_capable(mc.main_sdrs.flags) {
        return vec![IPMI_CC_INV_CMD];
    }
    mc.in_update_mode = true;
    vec![0]
}

pub(crate) fn handle_exit_sdr_repo_update(mc: &mut McData, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SDR_REPOSITORY_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }
    if !modal_capable(mc.main_sdrs.flags) {
        return vec![IPMI_CC_INV_CMD];
    }
    mc.in_update_mode = false;
    vec![0]
}

/*
 * Device SDR repository commands (sensor/event netfn).
 */

pub(crate) fn handle_get_device_sdr_info(mc: &mut McData, lun: u8, _msg: &IpmiMsg) -> Vec<u8> {
    if mc.device_support & IPMI_DEVID_SENSOR_DEV == 0 {
        return vec![IPMI_CC_INV_CMD];
    }

    let lun = usize::from(lun & 0x3);
    let mut rsp = vec![0u8; 3];
    rsp[1] = mc.num_sensors_per_lun[lun];
    rsp[2] = (u8::from(mc.dynamic_sensor_population) << 7)
        | (u8::from(mc.lun_has_sensors[3]) << 3)
        | (u8::from(mc.lun_has_sensors[2]) << 2)
        | (u8::from(mc.lun_has_sensors[1]) << 1)
        | u8::from(mc.lun_has_sensors[0]);
    if mc.dynamic_sensor_population {
        rsp.resize(7, 0);
        set_uint32_le(&mut rsp[3..], mc.sensor_population_change_time);
    }
    rsp
}

pub(crate) fn handle_reserve_device_sdr_repo(mc: &mut McData, lun: u8, _msg: &IpmiMsg) -> Vec<u8> {
    if !mc.has_device_sdrs || !mc.dynamic_sensor_population {
        return vec![IPMI_CC_INV_CMD];
    }

    let reservation = mc.device_sdrs[usize::from(lun & 0x3)].reserve();
    let mut rsp = vec![0u8; 3];
    set_uint16_le(&mut rsp[1..], reservation);
    rsp
}

pub(crate) fn handle_get_device_sdr(mc: &mut McData, lun: u8, msg: &IpmiMsg, limit: usize) -> Vec<u8> {
    if !mc.has_device_sdrs {
        return vec![IPMI_CC_INV_CMD];
    }
    let check = mc.dynamic_sensor_population;
    read_record(&mc.device_sdrs[usize::from(lun & 0x3)], msg, limit, check)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO_FLAGS: u8 = IPMI_SDR_GET_ALLOC_INFO_SUPPORTED
        | IPMI_SDR_RESERVE_SUPPORTED
        | IPMI_SDR_PARTIAL_ADD_SUPPORTED
        | IPMI_SDR_DELETE_SUPPORTED
        | (IPMI_SDR_MODAL_BOTH << 5);

    fn test_mc() -> McData {
        let mut mc = McData::new(
            0x20, 0x20, true, 1, 2, 0, 0xbf, [0x12, 0x34, 0x56], [0x78, 0x9a], true,
        );
        mc.main_sdrs.set_flags(REPO_FLAGS);
        mc
    }

    fn msg<'a>(cmd: u8, data: &'a [u8]) -> IpmiMsg<'a> {
        IpmiMsg::new(IPMI_NETFN_STORAGE, cmd, data)
    }

    /// A minimal record whose length byte matches the body.
    fn record_bytes(body_len: u8, fill: u8) -> Vec<u8> {
        let mut rec = vec![0u8; usize::from(body_len) + SDR_HEADER_LEN];
        rec[3] = 0x51;
        rec[4] = 0x01;
        rec[5] = body_len;
        for b in rec[SDR_HEADER_LEN..].iter_mut() {
            *b = fill;
        }
        rec
    }

    fn add_via_wire(mc: &mut McData, rec: &[u8]) -> u16 {
        let rsp = handle_add_sdr(mc, &msg(IPMI_CMD_ADD_SDR, rec));
        assert_eq!(rsp[0], 0, "add failed: {:02x?}", rsp);
        get_uint16_le(&rsp[1..])
    }

    fn get_all_bytes(mc: &mut McData, id: u16) -> Vec<u8> {
        let req = [0, 0, (id & 0xff) as u8, (id >> 8) as u8, 0, 0xff];
        let rsp = handle_get_sdr(mc, &msg(IPMI_CMD_GET_SDR, &req), IPMI_BUF_SIZE);
        assert_eq!(rsp[0], 0);
        rsp[3..].to_vec()
    }

    #[test]
    fn test_add_then_get_roundtrip() {
        let mut mc = test_mc();
        let rec = record_bytes(10, 0xab);
        let id = add_via_wire(&mut mc, &rec);

        let mut expect = rec.clone();
        set_uint16_le(&mut expect, id);
        assert_eq!(get_all_bytes(&mut mc, id), expect);
    }

    #[test]
    fn test_add_length_mismatch() {
        let mut mc = test_mc();
        let mut rec = record_bytes(10, 0);
        rec.push(0xee);
        let rsp = handle_add_sdr(&mut mc, &msg(IPMI_CMD_ADD_SDR, &rec));
        assert_eq!(rsp, vec![SDR_LENGTH_INVALID_CC]);
        assert_eq!(mc.main_sdrs.count(), 0);
    }

    #[test]
    fn test_modal_only_gating() {
        let mut mc = test_mc();
        mc.main_sdrs
            .set_flags(IPMI_SDR_RESERVE_SUPPORTED | (IPMI_SDR_NON_MODAL_ONLY << 5));
        let rec = record_bytes(4, 1);
        let rsp = handle_add_sdr(&mut mc, &msg(IPMI_CMD_ADD_SDR, &rec));
        assert_eq!(rsp, vec![IPMI_CC_NOT_SUPPORTED_PRESENT_STATE]);

        mc.in_update_mode = true;
        let rsp = handle_add_sdr(&mut mc, &msg(IPMI_CMD_ADD_SDR, &rec));
        assert_eq!(rsp[0], 0);
    }

    #[test]
    fn test_enter_exit_update_mode() {
        let mut mc = test_mc();
        let rsp = handle_enter_sdr_repo_update(&mut mc, &msg(IPMI_CMD_ENTER_SDR_REPO_UPDATE, &[]));
        assert_eq!(rsp, vec![0]);
        assert!(mc.in_update_mode);
        let rsp = handle_exit_sdr_repo_update(&mut mc, &msg(IPMI_CMD_EXIT_SDR_REPO_UPDATE, &[]));
        assert_eq!(rsp, vec![0]);
        assert!(!mc.in_update_mode);

        // Non-modal repositories reject the mode switch outright.
        mc.main_sdrs.set_flags(IPMI_SDR_NON_MODAL_ONLY << 5);
        let rsp = handle_enter_sdr_repo_update(&mut mc, &msg(IPMI_CMD_ENTER_SDR_REPO_UPDATE, &[]));
        assert_eq!(rsp, vec![IPMI_CC_INV_CMD]);
    }

    #[test]
    fn test_partial_add_matches_single_shot() {
        let mut mc = test_mc();
        let rec = record_bytes(20, 0xcd);
        let single_id = add_via_wire(&mut mc, &rec);
        let single = get_all_bytes(&mut mc, single_id);

        let rsp = handle_reserve_sdr_repo(&mut mc, &msg(IPMI_CMD_RESERVE_SDR_REPO, &[]));
        let res = get_uint16_le(&rsp[1..]);

        // First segment: record bytes 0..14.
        let split = 14;
        let mut seg1 = vec![(res & 0xff) as u8, (res >> 8) as u8, 0, 0, 0, 0];
        seg1.extend_from_slice(&rec[..split]);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg1));
        assert_eq!(rsp[0], 0);
        let part_id = get_uint16_le(&rsp[1..]);
        assert_ne!(part_id, 0);

        // Second and last segment: the rest, at the exact watermark.
        let mut seg2 = vec![
            (res & 0xff) as u8,
            (res >> 8) as u8,
            (part_id & 0xff) as u8,
            (part_id >> 8) as u8,
            split as u8,
            1,
        ];
        seg2.extend_from_slice(&rec[split..]);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg2));
        assert_eq!(rsp[0], 0);
        assert_eq!(get_uint16_le(&rsp[1..]), part_id);

        let part = get_all_bytes(&mut mc, part_id);
        assert_eq!(part[2..], single[2..]);
    }

    #[test]
    fn test_partial_add_gap_aborts() {
        let mut mc = test_mc();
        let rec = record_bytes(20, 7);
        let mut seg1 = vec![0, 0, 0, 0, 0, 0];
        seg1.extend_from_slice(&rec[..14]);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg1));
        let id = get_uint16_le(&rsp[1..]);

        let mut seg2 = vec![0, 0, (id & 0xff) as u8, (id >> 8) as u8, 16, 1];
        seg2.extend_from_slice(&rec[16..]);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg2));
        assert_eq!(rsp, vec![IPMI_CC_INV_DATA_FIELD_IN_REQ]);
        assert!(mc.part_add.is_none());
        assert_eq!(mc.main_sdrs.count(), 0);
    }

    #[test]
    fn test_partial_add_short_total_rejected() {
        let mut mc = test_mc();
        let rec = record_bytes(20, 7);
        let mut seg1 = vec![0, 0, 0, 0, 0, 0];
        seg1.extend_from_slice(&rec[..14]);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg1));
        let id = get_uint16_le(&rsp[1..]);

        // Declare done two bytes early.
        let mut seg2 = vec![0, 0, (id & 0xff) as u8, (id >> 8) as u8, 14, 1];
        seg2.extend_from_slice(&rec[14..24]);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg2));
        assert_eq!(rsp, vec![SDR_LENGTH_INVALID_CC]);
        assert_eq!(mc.main_sdrs.count(), 0);
    }

    #[test]
    fn test_partial_add_nonzero_offset_on_first_packet() {
        let mut mc = test_mc();
        let rec = record_bytes(8, 1);
        let mut seg = vec![0, 0, 0, 0, 4, 0];
        seg.extend_from_slice(&rec);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg));
        assert_eq!(rsp, vec![IPMI_CC_INV_DATA_FIELD_IN_REQ]);
    }

    #[test]
    fn test_reserve_aborts_partial_add() {
        let mut mc = test_mc();
        let rec = record_bytes(20, 7);
        let mut seg1 = vec![0, 0, 0, 0, 0, 0];
        seg1.extend_from_slice(&rec[..14]);
        handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg1));
        assert!(mc.part_add.is_some());

        handle_reserve_sdr_repo(&mut mc, &msg(IPMI_CMD_RESERVE_SDR_REPO, &[]));
        assert!(mc.part_add.is_none());
    }

    #[test]
    fn test_partial_add_stale_reservation() {
        let mut mc = test_mc();
        mc.main_sdrs.reserve();
        let rec = record_bytes(8, 7);
        let mut seg = vec![0x42, 0x42, 0, 0, 0, 1];
        seg.extend_from_slice(&rec);
        let rsp = handle_partial_add_sdr(&mut mc, &msg(IPMI_CMD_PARTIAL_ADD_SDR, &seg));
        assert_eq!(rsp, vec![IPMI_CC_RES_CANCELED]);
    }

    #[test]
    fn test_get_sdr_next_record_chain() {
        let mut mc = test_mc();
        let a = add_via_wire(&mut mc, &record_bytes(4, 1));
        let b = add_via_wire(&mut mc, &record_bytes(4, 2));

        let rsp = handle_get_sdr(&mut mc, &msg(IPMI_CMD_GET_SDR, &[0, 0, 0, 0, 0, 2]), 64);
        assert_eq!(get_uint16_le(&rsp[1..]), b);
        assert_eq!(get_uint16_le(&rsp[3..]), a);

        let req = [0, 0, (b & 0xff) as u8, (b >> 8) as u8, 0, 2];
        let rsp = handle_get_sdr(&mut mc, &msg(IPMI_CMD_GET_SDR, &req), 64);
        assert_eq!(&rsp[1..3], &[0xff, 0xff]);
    }

    #[test]
    fn test_get_sdr_bounds() {
        let mut mc = test_mc();
        let id = add_via_wire(&mut mc, &record_bytes(4, 1));
        let lo = (id & 0xff) as u8;
        let hi = (id >> 8) as u8;

        let rsp = handle_get_sdr(&mut mc, &msg(IPMI_CMD_GET_SDR, &[0, 0, lo, hi, 10, 1]), 64);
        assert_eq!(rsp, vec![IPMI_CC_PARAM_OUT_OF_RANGE]);

        // Response budget too small for the requested window.
        let rsp = handle_get_sdr(&mut mc, &msg(IPMI_CMD_GET_SDR, &[0, 0, lo, hi, 0, 8]), 6);
        assert_eq!(rsp, vec![IPMI_CC_CANT_RET_NUM_REQ_BYTES]);
    }

    #[test]
    fn test_delete_sdr_updates_erase_time() {
        let mut mc = test_mc();
        let id = add_via_wire(&mut mc, &record_bytes(4, 1));
        let req = [0, 0, (id & 0xff) as u8, (id >> 8) as u8];
        let rsp = handle_delete_sdr(&mut mc, &msg(IPMI_CMD_DELETE_SDR, &req));
        assert_eq!(get_uint16_le(&rsp[1..]), id);
        assert_eq!(mc.main_sdrs.count(), 0);
        assert_ne!(mc.main_sdrs.last_erase_time, 0);
    }

    #[test]
    fn test_clear_sdr_repo() {
        let mut mc = test_mc();
        add_via_wire(&mut mc, &record_bytes(4, 1));
        add_via_wire(&mut mc, &record_bytes(4, 2));
        let rsp = handle_clear_sdr_repo(
            &mut mc,
            &msg(IPMI_CMD_CLEAR_SDR_REPO, &[0, 0, b'C', b'L', b'R', 0x00]),
        );
        assert_eq!(rsp, vec![0, 0x01]);
        assert_eq!(mc.main_sdrs.count(), 0);
    }

    #[test]
    fn test_repo_info() {
        let mut mc = test_mc();
        add_via_wire(&mut mc, &record_bytes(4, 1));
        let rsp = handle_get_sdr_repo_info(&mut mc, &msg(IPMI_CMD_GET_SDR_REPO_INFO, &[]));
        assert_eq!(rsp[1], 0x51);
        assert_eq!(get_uint16_le(&rsp[2..]), 1);
        assert_eq!(get_uint16_le(&rsp[4..]), 0xfffe);
        assert_eq!(rsp[14], REPO_FLAGS);
    }

    #[test]
    fn test_repo_time_roundtrip() {
        let mut mc = test_mc();
        let rsp = handle_set_sdr_repo_time(
            &mut mc,
            &msg(IPMI_CMD_SET_SDR_REPO_TIME, &[0x40, 0x30, 0x20, 0x10]),
        );
        assert_eq!(rsp, vec![0]);
        let rsp = handle_get_sdr_repo_time(&mut mc, &msg(IPMI_CMD_GET_SDR_REPO_TIME, &[]));
        let t = get_uint32_le(&rsp[1..]);
        assert!((0x1020_3040..=0x1020_3041).contains(&t));
    }

    #[test]
    fn test_config_add_record_stamps_id() {
        let mut sdrs = Sdrs::new(0);
        let rec = record_bytes(6, 0x33);
        let id = sdrs.add_record(&rec).unwrap();
        assert_eq!(get_uint16_le(&sdrs.records()[0].data), id);
        assert!(sdrs.add_record(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_device_sdr_info_and_read() {
        let mut mc = test_mc();
        mc.add_device_sdr(1, &record_bytes(4, 0x66)).unwrap();

        let rsp = handle_get_device_sdr_info(&mut mc, 1, &msg(0x20, &[]));
        assert_eq!(rsp[1], 1);
        assert_eq!(rsp[2] & 0x80, 0x80);
        assert_eq!(rsp[2] & 0x0f, 0b0010);
        assert_eq!(rsp.len(), 7);

        let rsp = handle_get_device_sdr(&mut mc, 1, &msg(0x21, &[0, 0, 0, 0, 0, 0xff]), 64);
        assert_eq!(rsp[0], 0);
        assert_eq!(rsp[3 + 5], 4);

        // Wrong reservation on a dynamic population is refused.
        mc.device_sdrs[1].reserve();
        let rsp = handle_get_device_sdr(&mut mc, 1, &msg(0x21, &[9, 9, 0, 0, 0, 4]), 64);
        assert_eq!(rsp, vec![IPMI_CC_RES_CANCELED]);
    }

    #[test]
    fn test_reserve_device_sdr_repo() {
        let mut mc = test_mc();
        let rsp = handle_reserve_device_sdr_repo(&mut mc, 0, &msg(0x22, &[]));
        assert_eq!(rsp, vec![0, 1, 0]);

        mc.dynamic_sensor_population = false;
        let rsp = handle_reserve_device_sdr_repo(&mut mc, 0, &msg(0x22, &[]));
        assert_eq!(rsp, vec![IPMI_CC_INV_CMD]);
    }
}
