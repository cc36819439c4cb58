#![no_std]
#![no_main]

mod peripherals;
mod system;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Core
use core::cell::RefCell;

// Device
use embassy_embedded_hal::shared_bus::blocking::i2c::I2cDevice;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    interrupt::{self, InterruptExt, Priority},
    peripherals::{SPI2, TWISPI1},
    spim,
    twim::{self, Twim},
};
use embassy_sync::{
    blocking_mutex::{
        raw::{NoopRawMutex, ThreadModeRawMutex},
        Mutex,
    },
    signal::Signal,
};
use embassy_time::{with_timeout, Duration, Instant, Timer};
use static_cell::StaticCell;

// BLE
use nrf_softdevice::{
    ble::{gatt_server, peripheral},
    Softdevice,
};

bind_interrupts!(struct Irqs {
    SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1 => twim::InterruptHandler<TWISPI1>;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{
    backlight::{Backlight, LEVEL_AMBIENT, LEVEL_INTERACTIVE},
    button::Button,
    display::Display,
    touch::TouchController,
};
use system::{
    bluetooth::{self, CurrentTimeServiceEvent, Server, ServerEvent, WeatherServiceEvent},
    config::SystemConfig,
};

use pinetime_weatherface::{
    clock::{TimeReference, MINUTE_MS},
    ui::{FaceConfig, ScreenShape},
    weather::channel,
    ClockReading, Effect, Effects, FaceEvent, FaceHandle, FaceRegistry, TimeSource, WallClock,
    WatchFace,
};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

/// Inactivity until the face drops to ambient mode
const AMBIENT_TIMEOUT: Duration = Duration::from_secs(10);
/// Further inactivity until the display is switched off
const SLEEP_TIMEOUT: Duration = Duration::from_secs(20);

/// State shared by the tasks
struct Watch {
    faces: FaceRegistry<1>,
    clock: WallClock,
}

type SharedWatch = Mutex<ThreadModeRawMutex, RefCell<Watch>>;

static WATCH: StaticCell<SharedWatch> = StaticCell::new();
static I2C_BUS: StaticCell<Mutex<NoopRawMutex, RefCell<Twim<'static, TWISPI1>>>> =
    StaticCell::new();

/// Commands for the interactive update timer
#[derive(Clone, Copy, defmt::Format)]
enum TickCommand {
    Cancel,
    After { face: FaceHandle, delay_ms: u32 },
}

// Communication channels
static CHANNEL: Signal<ThreadModeRawMutex, bool> = Signal::new();
static REDRAW: Signal<ThreadModeRawMutex, ()> = Signal::new();
static TICK: Signal<ThreadModeRawMutex, TickCommand> = Signal::new();
static WAKE: Signal<ThreadModeRawMutex, ()> = Signal::new();

fn uptime_ms() -> u64 {
    Instant::now().as_millis()
}

fn read_clock(watch: &SharedWatch) -> ClockReading {
    watch.lock(|watch| watch.borrow().clock.at(uptime_ms()))
}

/// Deliver an event to a face and carry out what it asks for
fn dispatch(watch: &SharedWatch, face: FaceHandle, event: FaceEvent) {
    let effects = watch.lock(|watch| {
        let mut watch = watch.borrow_mut();
        let clock = watch.clock.at(uptime_ms());
        watch.faces.dispatch(face, event, &clock)
    });

    match effects {
        Some(effects) => apply(face, effects),
        None => defmt::debug!("Face {} is gone, event dropped", face),
    }
}

fn apply(face: FaceHandle, effects: Effects) {
    for effect in effects {
        match effect {
            Effect::Redraw => REDRAW.signal(()),
            Effect::ConnectChannel => CHANNEL.signal(true),
            Effect::DisconnectChannel => CHANNEL.signal(false),
            // Time zone changes reach the face through the CTS handler,
            // the face filters them by its own subscription state
            Effect::SubscribeTimezone | Effect::UnsubscribeTimezone => {
                defmt::debug!("{}", effect)
            }
            Effect::CancelTick => TICK.signal(TickCommand::Cancel),
            Effect::ScheduleTick { delay_ms } => TICK.signal(TickCommand::After { face, delay_ms }),
        }
    }
}

/// Polls the button state every 10ms
#[embassy_executor::task(pool_size = 1)]
async fn poll_button(mut button: Button<'static>) {
    loop {
        if button.pressed().await {
            defmt::debug!("Button pressed");
            WAKE.signal(());
        }

        // Re-schedule the timer interrupt in 10ms
        Timer::after(Duration::from_millis(10)).await;
    }
}

/// Polls the touch controller every 10ms
#[embassy_executor::task(pool_size = 1)]
async fn poll_touch(
    watch: &'static SharedWatch,
    face: FaceHandle,
    mut touch: TouchController<'static, TWISPI1>,
) {
    loop {
        if let Some(sample) = touch.try_event_detected() {
            // Taps only reach an interactive face, otherwise a touch just wakes it
            let interactive = watch.lock(|watch| {
                watch
                    .borrow()
                    .faces
                    .get(face)
                    .map(|f| f.is_visible() && !f.display().ambient)
                    .unwrap_or(false)
            });
            WAKE.signal(());

            if interactive {
                dispatch(
                    watch,
                    face,
                    FaceEvent::Tap {
                        kind: sample.kind,
                        x: sample.x,
                        y: sample.y,
                        time_ms: uptime_ms(),
                    },
                );
            }
        }

        // Re-schedule the timer interrupt in 10ms
        Timer::after(Duration::from_millis(10)).await;
    }
}

/// Moves the face between interactive, ambient and hidden on inactivity
#[embassy_executor::task(pool_size = 1)]
async fn power_manager(
    watch: &'static SharedWatch,
    face: FaceHandle,
    mut backlight: Backlight<'static>,
) {
    loop {
        dispatch(watch, face, FaceEvent::VisibilityChanged(true));
        dispatch(watch, face, FaceEvent::AmbientModeChanged(false));
        if let Err(e) = backlight.set(LEVEL_INTERACTIVE) {
            defmt::warn!("Backlight: {}", e);
        }

        if with_timeout(AMBIENT_TIMEOUT, WAKE.wait()).await.is_ok() {
            continue;
        }

        defmt::info!("Entering ambient mode");
        dispatch(watch, face, FaceEvent::AmbientModeChanged(true));
        if let Err(e) = backlight.set(LEVEL_AMBIENT) {
            defmt::warn!("Backlight: {}", e);
        }

        if with_timeout(SLEEP_TIMEOUT, WAKE.wait()).await.is_ok() {
            continue;
        }

        defmt::info!("Display off");
        dispatch(watch, face, FaceEvent::VisibilityChanged(false));
        backlight.off();

        WAKE.wait().await;
    }
}

/// Runs the interactive update timer of the face
#[embassy_executor::task(pool_size = 1)]
async fn face_ticker(watch: &'static SharedWatch) {
    let mut pending: Option<(FaceHandle, Instant)> = None;
    loop {
        let command = match pending {
            None => Some(TICK.wait().await),
            Some((_, deadline)) => match select(TICK.wait(), Timer::at(deadline)).await {
                Either::First(command) => Some(command),
                Either::Second(()) => None,
            },
        };

        match command {
            Some(TickCommand::Cancel) => pending = None,
            Some(TickCommand::After { face, delay_ms }) => {
                pending = Some((face, Instant::now() + Duration::from_millis(delay_ms as u64)))
            }
            None => {
                if let Some((face, _)) = pending.take() {
                    dispatch(watch, face, FaceEvent::UpdateTimer);
                }
            }
        }
    }
}

/// Minute tick of the system on wall clock minute boundaries, keeps the
/// ambient face current
#[embassy_executor::task(pool_size = 1)]
async fn time_tick(watch: &'static SharedWatch, face: FaceHandle) {
    loop {
        // Re-read every minute, the phone may have moved the clock
        let delay_ms = read_clock(watch).ms_until_next(MINUTE_MS);
        Timer::after(Duration::from_millis(delay_ms)).await;
        dispatch(watch, face, FaceEvent::TimeTick);
    }
}

#[embassy_executor::task(pool_size = 1)]
async fn update_lcd(
    watch: &'static SharedWatch,
    face: FaceHandle,
    mut display: Display<'static, SPI2>,
) {
    loop {
        REDRAW.wait().await;

        let result = watch.lock(|watch| {
            let watch = watch.borrow();
            let clock = watch.clock.at(uptime_ms());
            match watch.faces.get(face) {
                Some(f) if f.is_visible() => display.draw_face(f, &clock),
                _ => Ok(()),
            }
        });
        if let Err(e) = result {
            defmt::warn!("Drawing failed: {}", e);
        }
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Serves the data channel while the face keeps it enabled
#[embassy_executor::task(pool_size = 1)]
async fn bluetooth(
    sd: &'static Softdevice,
    server: Server,
    watch: &'static SharedWatch,
    face: FaceHandle,
) {
    let mut enabled = false;
    loop {
        if !enabled {
            enabled = CHANNEL.wait().await;
            continue;
        }

        let session = async {
            let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
                adv_data: &bluetooth::ADV_DATA,
                scan_data: &bluetooth::SCAN_DATA,
            };
            let conn =
                match peripheral::advertise_connectable(sd, adv, &peripheral::Config::default())
                    .await
                {
                    Ok(conn) => conn,
                    Err(e) => {
                        defmt::warn!("Advertising failed: {}", e);
                        return false;
                    }
                };
            dispatch(watch, face, FaceEvent::ChannelConnected);

            let e = gatt_server::run(&conn, &server, |e| on_server_event(watch, face, e)).await;
            defmt::info!("Disconnected: {}", e);
            dispatch(watch, face, FaceEvent::ChannelSuspended);
            true
        };

        match select(session, CHANNEL.wait()).await {
            // Keep advertising for the phone to come back
            Either::First(true) => {}
            Either::First(false) => {
                dispatch(watch, face, FaceEvent::ChannelFailed);
                enabled = false;
            }
            Either::Second(on) => enabled = on,
        }
    }
}

fn on_server_event(watch: &SharedWatch, face: FaceHandle, event: ServerEvent) {
    match event {
        ServerEvent::Time(CurrentTimeServiceEvent::CurrentTimeWrite(bytes)) => {
            match TimeReference::from_cts_bytes(&bytes, uptime_ms()) {
                Ok(reference) => {
                    watch.lock(|watch| watch.borrow_mut().clock.set_time(reference));
                    defmt::info!("Time set to {}", read_clock(watch).now_ms());
                    REDRAW.signal(());
                }
                Err(e) => defmt::warn!("Invalid current time: {}", e),
            }
        }
        ServerEvent::Time(CurrentTimeServiceEvent::LocalTimeInfoWrite([zone, dst])) => {
            let result = watch.lock(|watch| {
                watch
                    .borrow_mut()
                    .clock
                    .set_local_time_info(zone as i8, dst)
            });
            match result {
                Ok(()) => dispatch(watch, face, FaceEvent::TimezoneChanged),
                Err(e) => defmt::warn!("Invalid local time info: {}", e),
            }
        }
        ServerEvent::Weather(WeatherServiceEvent::PayloadWrite(payload)) => {
            match channel::decode(&payload) {
                Ok(events) => {
                    for update in channel::weather_updates(&events) {
                        dispatch(watch, face, FaceEvent::WeatherReceived(update));
                    }
                }
                Err(e) => defmt::warn!("Dropping weather payload: {}", e),
            }
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(SystemConfig::softdevice_compatible());
    defmt::info!("Initializing");

    // Keep peripheral interrupts off the priorities reserved for the SoftDevice
    interrupt::SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1.set_priority(Priority::P3);
    interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);

    // Initialize Backlight
    let backlight = Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
    );

    // Initialize Button
    let button = Button::init(
        Input::new(p.P0_13, Pull::None),
        Output::new(p.P0_15, Level::Low, OutputDrive::Standard),
    );

    // Initialize I2C
    let mut i2c_config = twim::Config::default();
    // Use I2C at 400KHz (the fastest clock available on the nRF52832),
    i2c_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI1, Irqs, p.P0_06, p.P0_07, i2c_config);
    let i2c_bus = I2C_BUS.init(Mutex::new(RefCell::new(i2c)));

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;
    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Initialize touch controller
    let touch = TouchController::init(
        I2cDevice::new(i2c_bus),
        Input::new(p.P0_28, Pull::Up), // Touchpad external interrupt pin: P0.28/AIN4 (TP_INT)
        Output::new(p.P0_10, Level::High, OutputDrive::Standard), // Touchpad reset pin: P0.10/NFC2 (TP_RESET)
    );

    // Initialize Bluetooth
    let sd = Softdevice::enable(&bluetooth::generate_config());
    let server = unwrap!(Server::new(sd));
    let sd: &'static Softdevice = sd;

    // Clock starts from the build time until the phone sets it
    let reference = unwrap!(TimeReference::from_epoch(UTC_EPOCH, uptime_ms()));
    let mut faces = FaceRegistry::new();
    let face = unwrap!(faces.insert(WatchFace::new(FaceConfig::default())));
    let watch: &'static SharedWatch = WATCH.init(Mutex::new(RefCell::new(Watch {
        faces,
        clock: WallClock::init(reference),
    })));

    // The PineTime panel is square and always shows full colour
    dispatch(watch, face, FaceEvent::InsetsApplied(ScreenShape::Square));
    dispatch(
        watch,
        face,
        FaceEvent::PropertiesChanged {
            low_bit_ambient: false,
        },
    );

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(update_lcd(watch, face, display)));
    unwrap!(spawner.spawn(face_ticker(watch)));
    unwrap!(spawner.spawn(time_tick(watch, face)));
    unwrap!(spawner.spawn(bluetooth(sd, server, watch, face)));
    unwrap!(spawner.spawn(poll_button(button)));
    unwrap!(spawner.spawn(poll_touch(watch, face, touch)));
    unwrap!(spawner.spawn(power_manager(watch, face, backlight)));
}
