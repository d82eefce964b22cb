use super::*;

use crate::sim::{SimClient, SimPlatform, SimRegisters};

pub(crate) type SimGdd = Gdd<SimRegisters, SimPlatform>;

/// A [`Gdd`] driving a simulated controller, plus a handle on its registers.
pub(crate) struct TestGdd {
    pub(crate) gdd: &'static SimGdd,
    pub(crate) hw: SimRegisters,
}

impl TestGdd {
    pub(crate) fn new() -> Self {
        Self::with_settings(GddSettings::default())
    }

    pub(crate) fn with_settings(settings: GddSettings) -> Self {
        trace_init();

        let hw = SimRegisters::new();
        let gdd = Gdd::new(hw.clone(), SimPlatform::new(), settings).unwrap();
        // the GDD is leaked so that it can be shared with callbacks and
        // threads, like it would be in a real driver
        let gdd = Box::leak(Box::new(gdd));
        gdd.init().unwrap();
        Self { gdd, hw }
    }

    /// Opens `endpoint` with a fresh recording client.
    pub(crate) fn open(&self, endpoint: Endpoint) -> &'static SimClient {
        let client = SimClient::leak();
        self.gdd.open(endpoint, client).unwrap();
        client
    }

    pub(crate) fn platform(&self) -> &SimPlatform {
        self.gdd.platform()
    }

    /// Starts a write of `words` words, returning the logical channel it was
    /// given.
    pub(crate) fn write(&self, endpoint: Endpoint, words: usize) -> u8 {
        let buf = leak_buf(words);
        unsafe { self.gdd.program_write(endpoint, buf, words) }.unwrap();
        self.owner_of(endpoint, Direction::Write)
    }

    /// Starts a read of `words` words, returning the logical channel it was
    /// given.
    pub(crate) fn read(&self, endpoint: Endpoint, words: usize) -> u8 {
        let buf = leak_buf(words);
        unsafe { self.gdd.program_read(endpoint, buf, words) }.unwrap();
        self.owner_of(endpoint, Direction::Read)
    }

    /// Plays the GDD interrupt: top half, then the bottom half it scheduled.
    pub(crate) fn interrupt(&self) -> BottomHalf {
        self.gdd.handle_interrupt();
        self.gdd
            .poll_bottom_half()
            .expect("top half should schedule the bottom half")
    }

    fn owner_of(&self, endpoint: Endpoint, direction: Direction) -> u8 {
        let lch = (0..self.gdd.settings().channel_count)
            .find(|&lch| {
                self.gdd.resolve_channel_owner(lch)
                    == Some(Owner {
                        endpoint,
                        direction,
                    })
            })
            .expect("programmed transfer should be bound to a channel");
        tracing::debug!(%endpoint, %direction, lch, "bound");
        lch
    }

    /// Checks that no two transfer records share a logical channel.
    #[track_caller]
    pub(crate) fn assert_bindings_unique(&self) {
        let inner = self.gdd.lock();
        let mut seen = std::collections::BTreeMap::new();
        for port in 1..=self.gdd.settings().ports {
            for ch in 0..self.gdd.settings().channels_per_port {
                let endpoint = Endpoint::new(port, ch);
                for dir in [Direction::Write, Direction::Read] {
                    if let Some(lch) = inner.channel(endpoint).record(dir).lch {
                        if let Some(prev) = seen.insert(lch, (endpoint, dir)) {
                            panic!(
                                "GDD channel {lch} bound to both {}/{} and {endpoint}/{dir}",
                                prev.0, prev.1
                            );
                        }
                    }
                }
            }
        }
    }
}

fn leak_buf(words: usize) -> *mut u32 {
    Box::leak(vec![0u32; words].into_boxed_slice()).as_mut_ptr()
}

pub(crate) fn trace_init() {
    use tracing_subscriber::{
        filter::{EnvFilter, LevelFilter},
        prelude::*,
    };
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = if env.is_empty() {
        builder.parse("hsi_gdd=debug").unwrap()
    } else {
        builder.parse_lossy(env)
    };

    let _res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .without_time()
        .finish()
        .try_init();
}
