//! The `ThreatIntelligence` contract surface.
//!
//! Mirrors `contracts/ThreatIntelligence.sol`. Call data is encoded, return
//! data and receipt logs decoded with these bindings; nothing else about the
//! contract is assumed.

use alloy::primitives::{Address, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    interface IThreatIntelligence {
        /// Emitted when a new threat record is stored.
        #[derive(Debug)]
        event ThreatReported(bytes32 indexed threatId, address indexed reporter, string url, uint8 level);

        /// Emitted when a record is marked verified.
        #[derive(Debug)]
        event ThreatVerified(bytes32 indexed threatId, address indexed verifier);

        function reportThreat(
            bytes32 threatId,
            string url,
            string signature,
            uint8 level,
            uint8 confidence,
            bool isMalicious
        ) external;

        function verifyThreat(bytes32 threatId) external;

        function threatExists(bytes32 threatId) external view returns (bool exists);

        function getThreatInfo(bytes32 threatId) external view returns (
            address reporter,
            string url,
            string signature,
            uint8 level,
            uint8 confidence,
            uint256 timestamp,
            bool isMalicious,
            bool verified
        );

        function getAllThreats() external view returns (bytes32[] ids);

        function getThreatsCount() external view returns (uint256 count);
    }
}

/// Functions a deployed binding must expose to be usable.
pub const REQUIRED_FUNCTIONS: &[&str] = &[
    "reportThreat",
    "verifyThreat",
    "threatExists",
    "getThreatInfo",
    "getAllThreats",
    "getThreatsCount",
];

/// First `E` emitted by `contract` among `logs`.
pub fn find_event<E: SolEvent>(logs: &[Log], contract: Address) -> Option<E> {
    logs.iter()
        .filter(|log| log.address == contract)
        .find_map(|log| E::decode_log_data(&log.data).ok())
}

#[cfg(test)]
mod tests {
    use super::IThreatIntelligence::*;
    use super::*;
    use alloy::primitives::B256;
    use alloy::sol_types::SolCall;

    #[test]
    fn test_report_call_roundtrip_keeps_fields() {
        let call = reportThreatCall {
            threatId: B256::repeat_byte(1),
            url: "http://example.com/login-verify".to_string(),
            signature: "phishing".to_string(),
            level: 8,
            confidence: 95,
            isMalicious: true,
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], reportThreatCall::SELECTOR.as_slice());

        let decoded = reportThreatCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.url, "http://example.com/login-verify");
        assert_eq!(decoded.level, 8);
        assert!(decoded.isMalicious);
    }

    #[test]
    fn test_selectors_are_distinct() {
        assert_ne!(threatExistsCall::SELECTOR, getThreatInfoCall::SELECTOR);
        assert_ne!(reportThreatCall::SELECTOR, verifyThreatCall::SELECTOR);
    }

    #[test]
    fn test_find_event_filters_by_emitter_and_kind() {
        let contract = Address::repeat_byte(0xcc);
        let reported = ThreatReported {
            threatId: B256::repeat_byte(7),
            reporter: Address::repeat_byte(0x01),
            url: "http://example.com/login-verify".to_string(),
            level: 8,
        };
        let logs = vec![
            Log {
                address: Address::repeat_byte(0xdd),
                data: reported.encode_log_data(),
            },
            Log {
                address: contract,
                data: ThreatVerified {
                    threatId: B256::repeat_byte(7),
                    verifier: Address::repeat_byte(0x01),
                }
                .encode_log_data(),
            },
        ];
        // Right event from the wrong emitter, wrong event from the right one
        assert!(find_event::<ThreatReported>(&logs, contract).is_none());

        let found = find_event::<ThreatVerified>(&logs, contract).unwrap();
        assert_eq!(found.threatId, B256::repeat_byte(7));

        let logs = vec![Log {
            address: contract,
            data: reported.encode_log_data(),
        }];
        let found = find_event::<ThreatReported>(&logs, contract).unwrap();
        assert_eq!(found.url, "http://example.com/login-verify");
        assert_eq!(found.level, 8);
    }
}
