pub mod shared {
    pub mod core {
        pub mod trace_id;
    }
    pub mod infrastructure {
        pub mod stream;
    }
}

pub mod modules {
    pub mod events {
        pub mod core {
            pub mod event;
        }
        pub mod use_cases {
            pub mod publish_events {
                pub mod publisher;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod make_noise {
                pub mod worker;
            }
        }
    }
    pub mod correlation {
        pub mod core {
            pub mod cache;
            pub mod record;
        }
        pub mod use_cases {
            pub mod ingest_stream {
                pub mod backoff;
                pub mod reader;
            }
            pub mod query_by_token {
                pub mod observer;
                pub mod inbound {
                    pub mod http;
                }
            }
        }
    }
}

pub mod shell;
