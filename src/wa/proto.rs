//! Hand-maintained protobuf message set for the WA MD noise handshake and
//! client bootstrap payload. Mirrors the subset of `WAWebProtobufsE2E`/
//! `WAWebProtobufsClient` that the handshake and auth flows touch.

pub mod wa {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct HandshakeMessage {
        #[prost(message, optional, tag = "2")]
        pub client_hello: Option<handshake_message::ClientHello>,
        #[prost(message, optional, tag = "3")]
        pub server_hello: Option<handshake_message::ServerHello>,
        #[prost(message, optional, tag = "4")]
        pub client_finish: Option<handshake_message::ClientFinish>,
    }

    pub mod handshake_message {
        use prost::Message;

        #[derive(Clone, PartialEq, Message)]
        pub struct ClientHello {
            #[prost(bytes = "vec", tag = "1")]
            pub ephemeral: Vec<u8>,
            #[prost(bytes = "vec", tag = "2")]
            pub r#static: Vec<u8>,
            #[prost(bytes = "vec", tag = "3")]
            pub payload: Vec<u8>,
            #[prost(bool, tag = "4")]
            pub use_extended: bool,
            #[prost(bytes = "vec", tag = "5")]
            pub extended_ciphertext: Vec<u8>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ServerHello {
            #[prost(bytes = "vec", tag = "1")]
            pub ephemeral: Vec<u8>,
            #[prost(bytes = "vec", tag = "2")]
            pub r#static: Vec<u8>,
            #[prost(bytes = "vec", tag = "3")]
            pub payload: Vec<u8>,
            #[prost(bytes = "vec", tag = "4")]
            pub extended_static: Vec<u8>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ClientFinish {
            #[prost(bytes = "vec", tag = "1")]
            pub r#static: Vec<u8>,
            #[prost(bytes = "vec", tag = "2")]
            pub payload: Vec<u8>,
            #[prost(bytes = "vec", tag = "3")]
            pub extended_ciphertext: Vec<u8>,
        }
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct CertChain {
        #[prost(message, optional, tag = "1")]
        pub intermediate: Option<cert_chain::NoiseCertificate>,
        #[prost(message, optional, tag = "2")]
        pub leaf: Option<cert_chain::NoiseCertificate>,
    }

    pub mod cert_chain {
        use prost::Message;

        #[derive(Clone, PartialEq, Message)]
        pub struct NoiseCertificate {
            #[prost(bytes = "vec", tag = "1")]
            pub details: Vec<u8>,
            #[prost(bytes = "vec", tag = "2")]
            pub signature: Vec<u8>,
        }

        pub mod noise_certificate {
            use prost::Message;

            #[derive(Clone, PartialEq, Message)]
            pub struct Details {
                #[prost(uint32, tag = "1")]
                pub serial: u32,
                #[prost(bytes = "vec", tag = "2")]
                pub key: Vec<u8>,
                #[prost(uint32, tag = "4")]
                pub issuer_serial: u32,
            }
        }
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct ClientPayload {
        #[prost(uint64, tag = "1")]
        pub username: u64,
        #[prost(bool, tag = "2")]
        pub passive: bool,
        #[prost(message, optional, tag = "3")]
        pub user_agent: Option<client_payload::UserAgent>,
        #[prost(message, optional, tag = "4")]
        pub web_info: Option<client_payload::WebInfo>,
        #[prost(string, tag = "5")]
        pub push_name: String,
        #[prost(enumeration = "client_payload::ConnectType", tag = "6")]
        pub connect_type: i32,
        #[prost(enumeration = "client_payload::ConnectReason", tag = "7")]
        pub connect_reason: i32,
        #[prost(uint32, tag = "8")]
        pub device: u32,
        #[prost(message, optional, tag = "9")]
        pub device_pairing_data: Option<client_payload::DevicePairingRegistrationData>,
        #[prost(bool, tag = "10")]
        pub pull: bool,
        #[prost(bool, tag = "11")]
        pub lid_db_migrated: bool,
    }

    pub mod client_payload {
        use prost::Message;

        #[derive(Clone, PartialEq, Message)]
        pub struct UserAgent {
            #[prost(enumeration = "user_agent::Platform", tag = "1")]
            pub platform: i32,
            #[prost(message, optional, tag = "2")]
            pub app_version: Option<user_agent::AppVersion>,
            #[prost(string, tag = "3")]
            pub mcc: String,
            #[prost(string, tag = "4")]
            pub mnc: String,
            #[prost(string, tag = "5")]
            pub os_version: String,
            #[prost(string, tag = "6")]
            pub manufacturer: String,
            #[prost(string, tag = "7")]
            pub device: String,
            #[prost(string, tag = "8")]
            pub os_build_number: String,
            #[prost(string, tag = "9")]
            pub phone_id: String,
            #[prost(enumeration = "user_agent::ReleaseChannel", tag = "10")]
            pub release_channel: i32,
            #[prost(string, tag = "11")]
            pub locale_language_iso_639_1: String,
            #[prost(string, tag = "12")]
            pub locale_country_iso_3166_1_alpha_2: String,
        }

        pub mod user_agent {
            use prost::Message;

            #[derive(Clone, PartialEq, Message)]
            pub struct AppVersion {
                #[prost(uint32, tag = "1")]
                pub primary: u32,
                #[prost(uint32, tag = "2")]
                pub secondary: u32,
                #[prost(uint32, tag = "3")]
                pub tertiary: u32,
                #[prost(uint32, tag = "4")]
                pub quaternary: u32,
                #[prost(uint32, tag = "5")]
                pub quinary: u32,
            }

            #[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
            #[repr(i32)]
            pub enum Platform {
                Web = 0,
            }

            #[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
            #[repr(i32)]
            pub enum ReleaseChannel {
                Release = 0,
            }
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct WebInfo {
            #[prost(enumeration = "web_info::WebSubPlatform", tag = "1")]
            pub web_sub_platform: i32,
        }

        pub mod web_info {
            #[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
            #[repr(i32)]
            pub enum WebSubPlatform {
                WebBrowser = 0,
                AppStore = 1,
                Win32 = 2,
                Darwin = 3,
            }
        }

        #[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
        #[repr(i32)]
        pub enum ConnectType {
            WifiUnknown = 0,
            CellularUnknown = 1,
        }

        #[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
        #[repr(i32)]
        pub enum ConnectReason {
            UserActivated = 0,
            SchedulerReconnect = 1,
            ErrorReconnect = 2,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DevicePairingRegistrationData {
            #[prost(bytes = "vec", tag = "1")]
            pub e_regid: Vec<u8>,
            #[prost(bytes = "vec", tag = "2")]
            pub e_keytype: Vec<u8>,
            #[prost(bytes = "vec", tag = "3")]
            pub e_ident: Vec<u8>,
            #[prost(bytes = "vec", tag = "4")]
            pub e_skey_id: Vec<u8>,
            #[prost(bytes = "vec", tag = "5")]
            pub e_skey_val: Vec<u8>,
            #[prost(bytes = "vec", tag = "6")]
            pub e_skey_sig: Vec<u8>,
            #[prost(bytes = "vec", tag = "7")]
            pub build_hash: Vec<u8>,
            #[prost(bytes = "vec", tag = "8")]
            pub device_props: Vec<u8>,
        }
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct DeviceProps {
        #[prost(string, tag = "1")]
        pub os: String,
        #[prost(message, optional, tag = "2")]
        pub version: Option<device_props::AppVersion>,
        #[prost(enumeration = "device_props::PlatformType", tag = "3")]
        pub platform_type: i32,
        #[prost(bool, tag = "4")]
        pub require_full_sync: bool,
        #[prost(message, optional, tag = "5")]
        pub history_sync_config: Option<device_props::HistorySyncConfig>,
    }

    pub mod device_props {
        use prost::Message;

        #[derive(Clone, PartialEq, Message)]
        pub struct AppVersion {
            #[prost(uint32, tag = "1")]
            pub primary: u32,
            #[prost(uint32, tag = "2")]
            pub secondary: u32,
            #[prost(uint32, tag = "3")]
            pub tertiary: u32,
            #[prost(uint32, tag = "4")]
            pub quaternary: u32,
            #[prost(uint32, tag = "5")]
            pub quinary: u32,
        }

        #[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
        #[repr(i32)]
        pub enum PlatformType {
            Chrome = 0,
            Firefox = 1,
            Safari = 5,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct HistorySyncConfig {
            #[prost(uint32, tag = "1")]
            pub storage_quota_mb: u32,
            #[prost(bool, tag = "2")]
            pub inline_initial_payload_in_e2ee_msg: bool,
            #[prost(bool, tag = "3")]
            pub support_call_log_history: bool,
            #[prost(bool, tag = "4")]
            pub support_bot_user_agent_chat_history: bool,
            #[prost(bool, tag = "5")]
            pub support_cag_reactions_and_polls: bool,
            #[prost(bool, tag = "6")]
            pub support_biz_hosted_msg: bool,
            #[prost(bool, tag = "7")]
            pub support_recent_sync_chunk_message_count_tuning: bool,
            #[prost(bool, tag = "8")]
            pub support_hosted_group_msg: bool,
            #[prost(bool, tag = "9")]
            pub support_fbid_bot_chat_history: bool,
            #[prost(bool, tag = "10")]
            pub support_message_association: bool,
            #[prost(bool, tag = "11")]
            pub support_group_history: bool,
        }
    }
}
