/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

// Constants
pub const IPMI_BUF_SIZE: usize = 1024;

// Network Function Codes
pub const IPMI_NETFN_CHASSIS: u8 = 0x0;
pub const IPMI_NETFN_BRIDGE: u8 = 0x2;
pub const IPMI_NETFN_SE: u8 = 0x4;
pub const IPMI_NETFN_APP: u8 = 0x6;
pub const IPMI_NETFN_FIRMWARE: u8 = 0x8;
pub const IPMI_NETFN_STORAGE: u8 = 0xa;
pub const IPMI_NETFN_TRANSPORT: u8 = 0xc;
pub const IPMI_NETFN_OEM0: u8 = 0x30;

pub const IPMI_BMC_SLAVE_ADDR: u8 = 0x20;

// App commands handled by the emulator
pub const BMC_GET_DEVICE_ID: u8 = 0x01;
pub const IPMI_CMD_SEND_MSG: u8 = 0x34;

/*
 * CC
 * See IPMI specification table 5-2 Generic Completion Codes
 */
pub const IPMI_CC_OK: u8 = 0x00;
pub const IPMI_CC_NODE_BUSY: u8 = 0xc0;
pub const IPMI_CC_INV_CMD: u8 = 0xc1;
pub const IPMI_CC_INV_CMD_FOR_LUN: u8 = 0xc2;
pub const IPMI_CC_TIMEOUT: u8 = 0xc3;
pub const IPMI_CC_OUT_OF_SPACE: u8 = 0xc4;
pub const IPMI_CC_RES_CANCELED: u8 = 0xc5;
pub const IPMI_CC_REQ_DATA_TRUNC: u8 = 0xc6;
pub const IPMI_CC_REQ_DATA_INV_LENGTH: u8 = 0xc7;
pub const IPMI_CC_REQ_DATA_FIELD_EXCEED: u8 = 0xc8;
pub const IPMI_CC_PARAM_OUT_OF_RANGE: u8 = 0xc9;
pub const IPMI_CC_CANT_RET_NUM_REQ_BYTES: u8 = 0xca;
pub const IPMI_CC_REQ_DATA_NOT_PRESENT: u8 = 0xcb;
pub const IPMI_CC_INV_DATA_FIELD_IN_REQ: u8 = 0xcc;
pub const IPMI_CC_ILL_SENSOR_OR_RECORD: u8 = 0xcd;
pub const IPMI_CC_RESP_COULD_NOT_BE_PRV: u8 = 0xce;
pub const IPMI_CC_CANT_RESP_DUPLI_REQ: u8 = 0xcf;
pub const IPMI_CC_CANT_RESP_SDRR_UPDATE: u8 = 0xd0;
pub const IPMI_CC_CANT_RESP_FIRM_UPDATE: u8 = 0xd1;
pub const IPMI_CC_CANT_RESP_BMC_INIT: u8 = 0xd2;
pub const IPMI_CC_DESTINATION_UNAVAILABLE: u8 = 0xd3;
pub const IPMI_CC_INSUFFICIENT_PRIVILEGES: u8 = 0xd4;
pub const IPMI_CC_NOT_SUPPORTED_PRESENT_STATE: u8 = 0xd5;
pub const IPMI_CC_ILLEGAL_COMMAND_DISABLED: u8 = 0xd6;
pub const IPMI_CC_UNSPECIFIED_ERROR: u8 = 0xff;

/// One IPMI request as the engine sees it: the netfn/cmd pair plus the raw
/// data bytes that follow them on the wire. Responder LUN travels separately.
#[derive(Debug, Clone, Copy)]
pub struct IpmiMsg<'a> {
    pub netfn: u8,
    pub cmd: u8,
    pub data: &'a [u8],
}

impl<'a> IpmiMsg<'a> {
    pub fn new(netfn: u8, cmd: u8, data: &'a [u8]) -> Self {
        Self { netfn, cmd, data }
    }

    /// Split a raw request buffer `[netfn<<2|lun, cmd, data...]`. Returns the
    /// request LUN alongside the message.
    pub fn parse(raw: &'a [u8]) -> Option<(Self, u8)> {
        if raw.len() < 2 {
            return None;
        }
        let msg = Self {
            netfn: raw[0] >> 2,
            cmd: raw[1],
            data: &raw[2..],
        };
        Some((msg, raw[0] & 0b11))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let raw = [0x18, 0x01, 0xaa, 0xbb];
        let (msg, lun) = IpmiMsg::parse(&raw).unwrap();
        assert_eq!(msg.netfn, IPMI_NETFN_APP);
        assert_eq!(lun, 0);
        assert_eq!(msg.cmd, BMC_GET_DEVICE_ID);
        assert_eq!(msg.data, &[0xaa, 0xbb]);
    }

    #[test]
    fn test_parse_short_request() {
        assert!(IpmiMsg::parse(&[0x18]).is_none());
        assert!(IpmiMsg::parse(&[]).is_none());
    }

    #[test]
    fn test_parse_lun_bits() {
        let raw = [(IPMI_NETFN_SE << 2) | 0x2, 0x2d];
        let (msg, lun) = IpmiMsg::parse(&raw).unwrap();
        assert_eq!(msg.netfn, IPMI_NETFN_SE);
        assert_eq!(lun, 2);
    }
}
