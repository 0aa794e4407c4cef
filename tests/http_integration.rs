// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP adapter using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wled_bridge::command::{SegmentPatch, StatePatch};
use wled_bridge::protocol::{DeviceApi, HttpClient, HttpConfig};
use wled_bridge::{ApiError, BridgeConfig, Command, ErrorKind, HttpBridge, ProtocolError};

fn address(server: &MockServer) -> String {
    server.uri().replace("http://", "")
}

fn state_doc() -> serde_json::Value {
    json!({
        "on": true,
        "bri": 191,
        "transition": 7,
        "ps": -1,
        "pl": -1,
        "nl": {"on": false, "dur": 60, "mode": 1, "tbri": 0},
        "udpn": {"send": false, "recv": true},
        "lor": 0,
        "mainseg": 0,
        "seg": [{"id": 0, "start": 0, "stop": 60, "len": 60, "on": true, "bri": 255,
                 "fx": 2, "sx": 128, "ix": 128, "pal": 1, "col": [[255, 0, 0], [0, 0, 0], [0, 0, 0]]}]
    })
}

fn info_doc() -> serde_json::Value {
    json!({
        "ver": "0.14.4",
        "vid": 2_405_180,
        "leds": {"count": 60, "maxseg": 32},
        "name": "Desk",
        "udpport": 21324,
        "mac": "aabbccddeeff",
        "ip": "10.0.0.40",
        "product": "FOSS",
        "brand": "WLED"
    })
}

async fn mount_device(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/json/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_doc()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_doc()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": state_doc(),
            "info": info_doc(),
            "effects": ["Solid", "Blink", "Breathe", "Wipe"],
            "palettes": ["Default", "* Random Cycle", "* Color 1"]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json/fxdata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "", "!;!,!;!;01", "!;!,!;!;", "!,!;!,!;!;"
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/presets.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "0": {},
            "1": {"n": "Warm"},
            "2": {"n": "Tour", "playlist": {"ps": [1], "dur": [300], "transition": [7]}}
        })))
        .mount(server)
        .await;
}

// ============================================================================
// HttpClient Tests
// ============================================================================

mod http_client {
    use super::*;

    #[tokio::test]
    async fn get_state_parses_document() {
        let server = MockServer::start().await;
        mount_device(&server).await;
        let client = HttpClient::new().unwrap();

        let state = client.get_state(&address(&server)).await.unwrap();

        assert!(state.on);
        assert_eq!(state.bri, 191);
        assert_eq!(state.preset(), None);
        assert_eq!(state.main_segment().map(|s| s.fx), Some(2));
    }

    #[tokio::test]
    async fn post_state_sends_patch_and_returns_echo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json/state"))
            .and(body_partial_json(json!({"on": true, "bri": 191, "v": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_doc()))
            .expect(1)
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let patch = StatePatch::new().with_on(true).with_bri(191);
        let echoed = client.post_state(&address(&server), &patch).await.unwrap();

        assert_eq!(echoed.map(|s| s.bri), Some(191));
    }

    #[tokio::test]
    async fn post_state_with_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json/state"))
            .and(body_partial_json(json!({"seg": [{"id": 0, "fx": 3}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_doc()))
            .expect(1)
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let mut segment = SegmentPatch::new(0);
        segment.fx = Some(3);
        let patch = StatePatch::new().with_segment(segment);

        assert!(client.post_state(&address(&server), &patch).await.is_ok());
    }

    #[tokio::test]
    async fn bare_acknowledgement_has_no_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let echoed = client
            .post_state(&address(&server), &StatePatch::new().with_on(false))
            .await
            .unwrap();

        assert!(echoed.is_none());
    }

    #[tokio::test]
    async fn refused_write_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let err = client
            .post_state(&address(&server), &StatePatch::new().with_on(true))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Protocol(ProtocolError::Rejected)));
    }

    #[tokio::test]
    async fn server_error_keeps_the_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/state"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let err = client.get_state(&address(&server)).await.unwrap_err();

        assert!(matches!(err, ApiError::Protocol(ProtocolError::Status { code: 503 })));
        assert!(!err.is_unreachable());
    }

    #[tokio::test]
    async fn malformed_json_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>router login</html>"))
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let err = client.get_info(&address(&server)).await.unwrap_err();

        assert!(matches!(err, ApiError::Protocol(ProtocolError::Malformed(_))));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let client = HttpClient::new().unwrap();

        let err = client.get_state("127.0.0.1:1").await.unwrap_err();

        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn slow_device_times_out_as_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/state"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(state_doc())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        let client = HttpConfig::new()
            .with_timeout(Duration::from_millis(200))
            .into_client()
            .unwrap();

        let err = client.get_state(&address(&server)).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::Unreachable { ref reason, .. } if reason == "timed out"
        ));
    }

    #[tokio::test]
    async fn capabilities_include_fxdata_and_presets() {
        let server = MockServer::start().await;
        mount_device(&server).await;
        let client = HttpClient::new().unwrap();

        let caps = client.get_capabilities(&address(&server)).await.unwrap();

        assert_eq!(caps.effects.len(), 4);
        assert_eq!(caps.palettes[0], "Default");
        assert_eq!(caps.fxdata.len(), 4);
        assert_eq!(caps.presets.len(), 2);
        assert!(caps.presets[&2].is_playlist());
        assert_eq!(caps.info.name.as_deref(), Some("Desk"));
    }

    #[tokio::test]
    async fn capabilities_degrade_on_old_firmware() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "info": {"ver": "0.10.2", "name": "Old"},
                "effects": ["Solid", "Blink"],
                "palettes": ["Default"]
            })))
            .mount(&server)
            .await;
        let client = HttpClient::new().unwrap();

        let caps = client.get_capabilities(&address(&server)).await.unwrap();

        assert_eq!(caps.effects, vec!["Solid".to_string(), "Blink".to_string()]);
        assert!(caps.fxdata.is_empty());
        assert!(caps.presets.is_empty());
    }
}

// ============================================================================
// Bridge Tests
// ============================================================================

mod bridge {
    use super::*;

    fn config(server: &MockServer) -> BridgeConfig {
        BridgeConfig::new()
            .with_devices(format!("desk:{}", address(server)))
            .with_discover_on_start(false)
    }

    #[tokio::test]
    async fn start_reads_device_and_catalog() {
        let server = MockServer::start().await;
        mount_device(&server).await;
        let bridge = HttpBridge::http(config(&server)).unwrap();

        let report = bridge.start().await;
        let status = bridge.status("desk").unwrap();

        assert_eq!(report.poll.updated, 1);
        assert!(status.online);
        assert_eq!(status.effect, "Breathe");
        assert_eq!(status.palette, "* Random Cycle");
        assert_eq!(status.color.as_deref(), Some("#FF0000"));
        assert_eq!(status.state.led_count, 60);
        assert_eq!(status.state.firmware, "0.14.4");
        assert_eq!(bridge.catalog().merged().len(wled_bridge::CatalogKind::Playlist), 1);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn command_posts_once_and_confirms() {
        let server = MockServer::start().await;
        mount_device(&server).await;
        Mock::given(method("POST"))
            .and(path("/json/state"))
            .and(body_partial_json(json!({"on": true, "bri": 191})))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_doc()))
            .expect(1)
            .mount(&server)
            .await;
        let bridge = HttpBridge::http(config(&server)).unwrap();
        bridge.start().await;

        let state = bridge
            .execute("desk", Command::On { brightness: Some(75) })
            .await
            .unwrap();

        assert!(state.power);
        assert_eq!(state.brightness.value(), 75);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_effect_never_reaches_the_device() {
        let server = MockServer::start().await;
        mount_device(&server).await;
        Mock::given(method("POST"))
            .and(path("/json/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_doc()))
            .expect(0)
            .mount(&server)
            .await;
        let bridge = HttpBridge::http(config(&server)).unwrap();
        bridge.start().await;

        let err = bridge.execute("desk", Command::SetEffect(999)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(err.to_string(), "invalid parameter: effect 999 is not in the catalog");
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn dead_device_goes_offline() {
        let config = BridgeConfig::new()
            .with_devices("desk:127.0.0.1:1")
            .with_discover_on_start(false);
        let bridge = HttpBridge::http(config).unwrap();

        let report = bridge.start().await;
        let err = bridge.execute("desk", Command::Off).await.unwrap_err();

        assert_eq!(report.poll.offline, 1);
        assert!(!bridge.status("desk").unwrap().online);
        assert_eq!(err.kind(), ErrorKind::DeviceOffline);
        bridge.shutdown().await;
    }
}
