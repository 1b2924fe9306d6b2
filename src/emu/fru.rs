/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! FRU inventory: fixed-size byte areas addressed by device id and a 16-bit
//! offset.

use crate::emu::mc::{short_msg, McData};
use crate::helper::{get_uint16_le, set_uint16_le};
use crate::ipmi::ipmi::*;

pub const IPMI_CMD_GET_FRU_AREA_INFO: u8 = 0x10;
pub const IPMI_CMD_READ_FRU_DATA: u8 = 0x11;
pub const IPMI_CMD_WRITE_FRU_DATA: u8 = 0x12;

/// Device ids 0..=254 are addressable; 255 is reserved.
pub const MAX_FRU_DEVICE_ID: u8 = 0xfe;

fn fru_area<'a>(mc: &'a McData, devid: u8) -> Option<&'a Vec<u8>> {
    if devid > MAX_FRU_DEVICE_ID {
        return None;
    }
    mc.frus.get(&devid)
}

pub(crate) fn handle_get_fru_area_info(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }

    let area = match fru_area(mc, msg.data[0]) {
        Some(area) => area,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };

    let mut rsp = vec![0u8; 4];
    set_uint16_le(&mut rsp[1..], area.len().min(0xffff) as u16);
    rsp[3] = 0; // byte access only
    rsp
}

pub(crate) fn handle_read_fru_data(mc: &mut McData, msg: &IpmiMsg, limit: usize) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 4) {
        return rsp;
    }

    let d = msg.data;
    let area = match fru_area(mc, d[0]) {
        Some(area) => area,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };

    let offset = usize::from(get_uint16_le(&d[1..]));
    let count = usize::from(d[3]);

    if offset >= area.len() {
        return vec![IPMI_CC_PARAM_OUT_OF_RANGE];
    }
    let count = count.min(area.len() - offset);
    if count + 2 > limit {
        return vec![IPMI_CC_CANT_RET_NUM_REQ_BYTES];
    }

    let mut rsp = vec![0, count as u8];
    rsp.extend_from_slice(&area[offset..offset + count]);
    rsp
}

pub(crate) fn handle_write_fru_data(mc: &mut McData, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 3) {
        return rsp;
    }

    let d = msg.data;
    let devid = d[0];
    if devid > MAX_FRU_DEVICE_ID {
        return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
    }

    let offset = usize::from(get_uint16_le(&d[1..]));
    let bytes = &d[3..];
    let area = match mc.frus.get_mut(&devid) {
        Some(area) => area,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };

    if offset >= area.len() {
        return vec![IPMI_CC_PARAM_OUT_OF_RANGE];
    }
    if offset + bytes.len() > area.len() {
        // Writes never truncate; anything past the end is refused whole.
        return vec![IPMI_CC_CANT_RET_NUM_REQ_BYTES];
    }

    area[offset..offset + bytes.len()].copy_from_slice(bytes);
    vec![0, bytes.len() as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mc() -> McData {
        let mut mc = McData::new(
            0x20, 0x20, false, 1, 2, 0, 0xbf, [0; 3], [0; 2], false,
        );
        mc.add_fru_data(0, 32, &[0x5a; 8]).unwrap();
        mc
    }

    fn msg<'a>(cmd: u8, data: &'a [u8]) -> IpmiMsg<'a> {
        IpmiMsg::new(IPMI_NETFN_STORAGE, cmd, data)
    }

    #[test]
    fn test_area_info() {
        let mut mc = test_mc();
        let rsp = handle_get_fru_area_info(&mut mc, &msg(IPMI_CMD_GET_FRU_AREA_INFO, &[0]));
        assert_eq!(rsp, vec![0, 32, 0, 0]);

        let rsp = handle_get_fru_area_info(&mut mc, &msg(IPMI_CMD_GET_FRU_AREA_INFO, &[7]));
        assert_eq!(rsp, vec![IPMI_CC_INV_DATA_FIELD_IN_REQ]);
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let mut mc = test_mc();
        let rsp = handle_write_fru_data(
            &mut mc,
            &msg(IPMI_CMD_WRITE_FRU_DATA, &[0, 10, 0, 0xde, 0xad, 0xbe, 0xef]),
        );
        assert_eq!(rsp, vec![0, 4]);

        let rsp = handle_read_fru_data(&mut mc, &msg(IPMI_CMD_READ_FRU_DATA, &[0, 10, 0, 4]), 64);
        assert_eq!(rsp, vec![0, 4, 0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_read_clamps_to_area_end() {
        let mut mc = test_mc();
        let rsp = handle_read_fru_data(&mut mc, &msg(IPMI_CMD_READ_FRU_DATA, &[0, 30, 0, 8]), 64);
        assert_eq!(rsp[1], 2);
        assert_eq!(rsp.len(), 4);
    }

    #[test]
    fn test_read_bounds() {
        let mut mc = test_mc();
        let rsp = handle_read_fru_data(&mut mc, &msg(IPMI_CMD_READ_FRU_DATA, &[0, 32, 0, 1]), 64);
        assert_eq!(rsp, vec![IPMI_CC_PARAM_OUT_OF_RANGE]);

        let rsp = handle_read_fru_data(&mut mc, &msg(IPMI_CMD_READ_FRU_DATA, &[0, 0, 0, 8]), 4);
        assert_eq!(rsp, vec![IPMI_CC_CANT_RET_NUM_REQ_BYTES]);
    }

    #[test]
    fn test_write_overflow_rejected() {
        let mut mc = test_mc();
        let mut req = vec![0u8, 30, 0];
        req.extend_from_slice(&[1, 2, 3, 4]);
        let rsp = handle_write_fru_data(&mut mc, &msg(IPMI_CMD_WRITE_FRU_DATA, &req));
        assert_eq!(rsp, vec![IPMI_CC_CANT_RET_NUM_REQ_BYTES]);
        // Nothing was written.
        let rsp = handle_read_fru_data(&mut mc, &msg(IPMI_CMD_READ_FRU_DATA, &[0, 30, 0, 2]), 64);
        assert_eq!(&rsp[2..], &[0, 0]);
    }

    #[test]
    fn test_write_offset_past_end() {
        let mut mc = test_mc();
        let rsp = handle_write_fru_data(&mut mc, &msg(IPMI_CMD_WRITE_FRU_DATA, &[0, 40, 0, 1]));
        assert_eq!(rsp, vec![IPMI_CC_PARAM_OUT_OF_RANGE]);
    }

    #[test]
    fn test_config_add_fru_data() {
        let mut mc = test_mc();
        // Seeded bytes land at the front, rest is zero.
        let rsp = handle_read_fru_data(&mut mc, &msg(IPMI_CMD_READ_FRU_DATA, &[0, 0, 0, 10]), 64);
        assert_eq!(&rsp[2..10], &[0x5a; 8]);
        assert_eq!(&rsp[10..12], &[0, 0]);

        assert!(mc.add_fru_data(255, 8, &[]).is_err());
        assert!(mc.add_fru_data(1, 4, &[1, 2, 3, 4, 5]).is_err());
    }
}
