//! The control loop state and the per-tick routine.

use crate::config::{
    CLOCK_INTERVAL_MS, DEVICE_ID, DISPLAY_TIMEOUT_MS, LIVE_BRIGHTNESS, LOG_INTERVAL_MS,
    MODE_BANNER_MS, SENSOR_INTERVAL_MS, STANDBY_BRIGHTNESS, STANDBY_INTERVAL_MS,
    TELEMETRY_INTERVAL_MS,
};
use crate::datalog::{DataLogger, LogStore};
use crate::error::Error;
use crate::hardware::{Pause, Relay, Screen, SensorSample, Sensors, WallClock};
use crate::irrigation::{self, WateringStatus};
use crate::location::LocationSource;
use crate::mode::{self, PlantMode};
use crate::schedule::PeriodicTask;
use crate::standby::{wake_condition, FieldTracker, Panel, StandbyMachine, Transition};
use crate::telemetry::{TelemetryRecord, Transport};
use log::{error, info, warn};

/// Independent periodic tasks of the loop.
#[derive(Debug, Clone, Copy)]
struct Tasks {
    /// Clock field, live only.
    clock: PeriodicTask,

    /// Sensor panel, live only.
    sensors: PeriodicTask,

    /// Mood graphic and relay, standby only.
    standby: PeriodicTask,

    /// CSV row.
    log: PeriodicTask,

    /// Telemetry upload.
    telemetry: PeriodicTask,
}

impl Default for Tasks {
    fn default() -> Self {
        Self {
            clock: PeriodicTask::new(CLOCK_INTERVAL_MS),
            sensors: PeriodicTask::new(SENSOR_INTERVAL_MS),
            standby: PeriodicTask::new(STANDBY_INTERVAL_MS),
            log: PeriodicTask::new(LOG_INTERVAL_MS),
            telemetry: PeriodicTask::new(TELEMETRY_INTERVAL_MS),
        }
    }
}

/// Device state owned by the control loop, plus its collaborators.
///
/// `B` is the board (sensors, relay, clock, busy-wait), `D` the screen, `S`
/// the log store, `T` the uplink and `G` the GPS.
pub struct Station<B, D, S, T, G> {
    board: B,
    screen: D,
    logger: DataLogger<S>,
    transport: T,
    gps: G,
    mode: PlantMode,
    display: StandbyMachine,
    fields: FieldTracker,
    tasks: Tasks,
    status: Option<WateringStatus>,
}

impl<B, D, S, T, G> Station<B, D, S, T, G>
where
    B: Sensors + Relay + WallClock + Pause,
    D: Screen,
    S: LogStore,
    T: Transport,
    G: LocationSource,
{
    /// Assemble a station in mode 1. Nothing is drawn until [`Station::start`].
    pub fn new(board: B, screen: D, logger: DataLogger<S>, transport: T, gps: G) -> Self {
        Self {
            board,
            screen,
            logger,
            transport,
            gps,
            mode: PlantMode::default(),
            display: StandbyMachine::new(DISPLAY_TIMEOUT_MS),
            fields: FieldTracker::default(),
            tasks: Tasks::default(),
            status: None,
        }
    }

    /// Current watering mode.
    pub fn mode(&self) -> PlantMode {
        self.mode
    }

    /// What the screen is showing.
    pub fn panel(&self) -> Panel {
        self.display.panel()
    }

    /// Status of the last irrigation decision.
    pub fn status(&self) -> Option<WateringStatus> {
        self.status
    }

    /// Show the live panel for the first time.
    pub fn start(&mut self, now_ms: u64) -> Result<(), Error> {
        info!("Starting in mode {} ({})", self.mode.number(), self.mode.label());
        self.display.enter_live(now_ms);
        self.show_live()
    }

    /// Run one loop iteration.
    ///
    /// Display failures are logged and never skip a step: the relay, the log
    /// row, telemetry and the transport run regardless of the screen.
    ///
    /// # Arguments
    /// * `now_ms` - Milliseconds since boot.
    ///
    /// # Returns
    /// * `Result<(), Error>` - The first relay failure of this tick.
    pub fn tick(&mut self, now_ms: u64) -> Result<(), Error> {
        let mut outcome = Ok(());

        if let Some(mode) = mode::select(self.board.pressed_buttons()) {
            outcome = outcome.and(self.change_mode(mode, now_ms));
        }

        let wake = wake_condition(self.board.distance_mm(), self.board.microphone());
        match self.display.evaluate(now_ms, wake) {
            Transition::EnterLive => outcome = outcome.and(self.show_live()),
            Transition::EnterStandby => self.show_standby(),
            Transition::Stay => {}
        }

        let live = self.display.is_live();

        if live && self.tasks.clock.poll(now_ms) {
            shown(self.screen.draw_clock(self.board.now()));
        }

        if live && self.tasks.sensors.poll(now_ms) {
            outcome = outcome.and(self.refresh_live());
        }

        if !live && self.tasks.standby.poll(now_ms) {
            outcome = outcome.and(self.refresh_standby());
        }

        if self.tasks.log.poll(now_ms) {
            let sample = self.board.sample();
            self.logger.record(self.board.now(), &sample);
        }

        self.gps.drain();
        if self.tasks.telemetry.poll(now_ms) {
            self.send_telemetry();
        }

        self.transport.pump();

        outcome
    }

    /// Switch mode, confirm it on screen, and return to the live panel.
    fn change_mode(&mut self, mode: PlantMode, now_ms: u64) -> Result<(), Error> {
        info!("Mode {} selected ({})", mode.number(), mode.label());
        self.mode = mode;

        shown(self.screen.draw_mode_banner(mode));
        self.board.pause_ms(MODE_BANNER_MS);

        self.display.enter_live(now_ms);
        self.show_live()
    }

    /// Redraw the whole live panel with fresh readings.
    fn show_live(&mut self) -> Result<(), Error> {
        shown(self.screen.set_backlight(LIVE_BRIGHTNESS));
        shown(self.screen.draw_live_panel());
        self.fields.invalidate();

        let sample = self.board.sample();
        self.draw_fields(&sample);
        shown(self.screen.draw_clock(self.board.now()));
        self.water(sample.moisture)
    }

    /// Clear the screen and show the idle sunflower.
    fn show_standby(&mut self) {
        info!("No activity, entering standby");
        self.fields.invalidate();
        shown(self.screen.set_backlight(STANDBY_BRIGHTNESS));
        shown(self.screen.draw_standby(None));
    }

    fn refresh_live(&mut self) -> Result<(), Error> {
        let sample = self.board.sample();
        self.draw_fields(&sample);
        self.water(sample.moisture)
    }

    fn refresh_standby(&mut self) -> Result<(), Error> {
        let moisture = self.board.moisture();
        let watered = self.water(moisture);
        shown(
            self.screen
                .draw_standby(Some(self.mode.threshold().mood(moisture))),
        );
        watered
    }

    /// Draw the fields that changed since the last redraw.
    fn draw_fields(&mut self, sample: &SensorSample) {
        if !sample.is_valid() {
            error!("Sensor read failed, keeping previous temperature/humidity");
            if self.fields.moisture(sample.moisture) {
                shown(self.screen.draw_moisture(sample.moisture));
            }
            return;
        }

        let changes = self.fields.update(sample);
        if changes.moisture {
            shown(self.screen.draw_moisture(sample.moisture));
        }
        if changes.temperature {
            shown(self.screen.draw_temperature(sample.temperature));
        }
        if changes.humidity {
            shown(self.screen.draw_humidity(sample.humidity));
        }
    }

    /// Run the irrigation decision; draw the status line while live.
    fn water(&mut self, moisture: i32) -> Result<(), Error> {
        let status = irrigation::water(&mut self.board, &self.mode.threshold(), moisture)?;

        if self.status != Some(status) {
            info!("Watering status: {}", status.label());
        }
        self.status = Some(status);

        if self.display.is_live() {
            shown(self.screen.draw_status(status));
        }

        Ok(())
    }

    fn send_telemetry(&mut self) {
        let position = self.gps.fix_or_default();
        if self.gps.fix().is_none() {
            warn!("No GPS fix, using default location");
        }

        let sample = self.board.sample();
        let record = TelemetryRecord::new(DEVICE_ID, &sample, position);

        match record.to_json() {
            Ok(json) => {
                info!("Sending telemetry: {json}");
                if let Err(e) = self.transport.send(&json) {
                    error!("Failed to send telemetry: {e}");
                }
            }
            Err(e) => error!("Failed to create IoT Hub message: {e}"),
        }
    }
}

/// Log a failed screen update; the loop carries on without it.
fn shown(result: Result<(), Error>) {
    if let Err(e) = result {
        error!("Display update failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockTime;
    use crate::hardware::{Climate, Tone};
    use crate::irrigation::Mood;
    use crate::location::Coordinates;
    use crate::mode::ModeButton;
    use crate::telemetry::ConnectionStatus;
    use enumset::EnumSet;

    struct FakeBoard {
        moisture: i32,
        climate: Climate,
        distance_mm: u16,
        mic: i32,
        buttons: EnumSet<ModeButton>,
        relay: Vec<bool>,
        pauses: Vec<u32>,
    }

    impl Default for FakeBoard {
        fn default() -> Self {
            Self {
                moisture: 300,
                climate: Climate {
                    temperature: 21.0,
                    humidity: 45.0,
                },
                distance_mm: 2_000,
                mic: 0,
                buttons: EnumSet::empty(),
                relay: Vec::new(),
                pauses: Vec::new(),
            }
        }
    }

    impl Sensors for FakeBoard {
        fn moisture(&mut self) -> i32 {
            self.moisture
        }

        fn climate(&mut self) -> Climate {
            self.climate
        }

        fn distance_mm(&mut self) -> u16 {
            self.distance_mm
        }

        fn microphone(&mut self) -> i32 {
            self.mic
        }

        fn pressed_buttons(&mut self) -> EnumSet<ModeButton> {
            self.buttons
        }
    }

    impl Relay for FakeBoard {
        fn set(&mut self, on: bool) -> Result<(), Error> {
            self.relay.push(on);
            Ok(())
        }
    }

    impl WallClock for FakeBoard {
        fn now(&self) -> ClockTime {
            ClockTime {
                hour: 8,
                minute: 30,
                second: 0,
            }
        }
    }

    impl Pause for FakeBoard {
        fn pause_ms(&mut self, ms: u32) {
            self.pauses.push(ms);
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Drawn {
        Backlight(u8),
        Panel,
        Clock,
        Moisture(i32),
        Temperature(f32),
        Humidity(f32),
        Status(WateringStatus),
        Standby(Option<Mood>),
        Banner(PlantMode),
    }

    #[derive(Default)]
    struct FakeScreen {
        drawn: Vec<Drawn>,
        broken: bool,
    }

    impl FakeScreen {
        fn record(&mut self, drawn: Drawn) -> Result<(), Error> {
            if self.broken {
                return Err(Error::Display("SPI bus fault".into()));
            }
            self.drawn.push(drawn);
            Ok(())
        }
    }

    impl Screen for FakeScreen {
        fn set_backlight(&mut self, percent: u8) -> Result<(), Error> {
            self.record(Drawn::Backlight(percent))
        }

        fn draw_live_panel(&mut self) -> Result<(), Error> {
            self.record(Drawn::Panel)
        }

        fn draw_clock(&mut self, _time: ClockTime) -> Result<(), Error> {
            self.record(Drawn::Clock)
        }

        fn draw_moisture(&mut self, moisture: i32) -> Result<(), Error> {
            self.record(Drawn::Moisture(moisture))
        }

        fn draw_temperature(&mut self, celsius: f32) -> Result<(), Error> {
            self.record(Drawn::Temperature(celsius))
        }

        fn draw_humidity(&mut self, percent: f32) -> Result<(), Error> {
            self.record(Drawn::Humidity(percent))
        }

        fn draw_status(&mut self, status: WateringStatus) -> Result<(), Error> {
            self.record(Drawn::Status(status))
        }

        fn draw_standby(&mut self, mood: Option<Mood>) -> Result<(), Error> {
            self.record(Drawn::Standby(mood))
        }

        fn draw_mode_banner(&mut self, mode: PlantMode) -> Result<(), Error> {
            self.record(Drawn::Banner(mode))
        }

        fn draw_notice(&mut self, _text: &str, _tone: Tone) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        lines: Vec<String>,
    }

    impl LogStore for MemoryStore {
        fn exists(&self) -> bool {
            !self.lines.is_empty()
        }

        fn append_line(&mut self, line: &str) -> Result<(), Error> {
            self.lines.push(line.to_owned());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: Vec<String>,
        pumps: usize,
    }

    impl Transport for FakeTransport {
        fn send(&mut self, payload: &str) -> Result<(), Error> {
            self.sent.push(payload.to_owned());
            Ok(())
        }

        fn pump(&mut self) {
            self.pumps += 1;
        }

        fn status(&self) -> ConnectionStatus {
            ConnectionStatus::Authenticated
        }
    }

    #[derive(Default)]
    struct FakeGps {
        fix: Option<Coordinates>,
        drains: usize,
    }

    impl LocationSource for FakeGps {
        fn drain(&mut self) {
            self.drains += 1;
        }

        fn fix(&self) -> Option<Coordinates> {
            self.fix
        }
    }

    type TestStation = Station<FakeBoard, FakeScreen, MemoryStore, FakeTransport, FakeGps>;

    fn station() -> TestStation {
        Station::new(
            FakeBoard::default(),
            FakeScreen::default(),
            DataLogger::new(MemoryStore::default()),
            FakeTransport::default(),
            FakeGps::default(),
        )
    }

    fn started() -> TestStation {
        let mut station = station();
        station.start(0).unwrap();
        station.screen.drawn.clear();
        station
    }

    #[test]
    fn start_draws_full_live_panel() {
        let mut station = station();
        station.start(0).unwrap();

        assert_eq!(
            station.screen.drawn,
            vec![
                Drawn::Backlight(100),
                Drawn::Panel,
                Drawn::Moisture(300),
                Drawn::Temperature(21.0),
                Drawn::Humidity(45.0),
                Drawn::Clock,
                Drawn::Status(WateringStatus::AllesGut),
            ]
        );
        assert_eq!(station.panel(), Panel::Live { since_ms: 0 });
        assert_eq!(station.board.relay, vec![false]);
    }

    #[test]
    fn mode_one_end_to_end() {
        let mut station = started();
        // Keep the panel live.
        station.board.distance_mm = 50;

        station.board.moisture = 5;
        station.tick(4_000).unwrap();
        assert_eq!(station.status(), Some(WateringStatus::Giessen));
        assert_eq!(station.board.relay.last(), Some(&true));

        station.board.moisture = 150;
        station.tick(8_000).unwrap();
        assert_eq!(station.status(), Some(WateringStatus::BaldGiessen));
        assert_eq!(station.board.relay.last(), Some(&false));

        station.board.moisture = 500;
        station.tick(12_000).unwrap();
        assert_eq!(station.status(), Some(WateringStatus::AllesGut));
        assert_eq!(station.board.relay.last(), Some(&false));

        assert!(station
            .screen
            .drawn
            .contains(&Drawn::Status(WateringStatus::AllesGut)));
    }

    #[test]
    fn live_refresh_redraws_only_changed_fields() {
        let mut station = started();
        station.board.distance_mm = 50;
        station.board.climate.temperature = 22.5;

        station.tick(4_000).unwrap();

        let fields: Vec<_> = station
            .screen
            .drawn
            .iter()
            .filter(|d| {
                matches!(
                    d,
                    Drawn::Moisture(_) | Drawn::Temperature(_) | Drawn::Humidity(_)
                )
            })
            .cloned()
            .collect();
        assert_eq!(fields, vec![Drawn::Temperature(22.5)]);
    }

    #[test]
    fn invalid_climate_skips_fields_but_still_waters() {
        let mut station = started();
        station.board.distance_mm = 50;
        station.board.climate.humidity = f32::NAN;
        station.board.moisture = 5;

        station.tick(4_000).unwrap();

        assert!(station.screen.drawn.contains(&Drawn::Moisture(5)));
        assert!(!station
            .screen
            .drawn
            .iter()
            .any(|d| matches!(d, Drawn::Temperature(_) | Drawn::Humidity(_))));
        assert_eq!(station.board.relay.last(), Some(&true));
    }

    #[test]
    fn timeout_enters_standby_and_clears_tracking() {
        let mut station = started();

        station.tick(20_001).unwrap();

        assert_eq!(station.panel(), Panel::Standby);
        assert!(station.fields.is_clear());
        assert_eq!(
            &station.screen.drawn[..2],
            &[Drawn::Backlight(20), Drawn::Standby(None)]
        );
    }

    #[test]
    fn redundant_wake_does_not_reset_live_timer() {
        let mut station = started();
        station.board.mic = 900;

        for now in [100, 200, 300, 400] {
            station.tick(now).unwrap();
        }

        assert_eq!(station.panel(), Panel::Live { since_ms: 0 });
        assert!(!station.screen.drawn.contains(&Drawn::Panel));
    }

    #[test]
    fn wake_from_standby_redraws_everything() {
        let mut station = started();
        station.tick(20_001).unwrap();
        station.screen.drawn.clear();

        station.board.distance_mm = 80;
        station.tick(20_050).unwrap();

        assert_eq!(station.panel(), Panel::Live { since_ms: 20_050 });
        assert_eq!(
            &station.screen.drawn[..5],
            &[
                Drawn::Backlight(100),
                Drawn::Panel,
                Drawn::Moisture(300),
                Drawn::Temperature(21.0),
                Drawn::Humidity(45.0),
            ]
        );
    }

    #[test]
    fn standby_refresh_draws_mood_and_drives_relay() {
        let mut station = started();
        station.tick(20_001).unwrap();
        station.screen.drawn.clear();

        station.board.moisture = 5;
        station.tick(24_001).unwrap();
        assert!(station.screen.drawn.contains(&Drawn::Standby(Some(Mood::Sad))));
        assert_eq!(station.board.relay.last(), Some(&true));
        assert!(!station
            .screen
            .drawn
            .iter()
            .any(|d| matches!(d, Drawn::Status(_))));

        station.board.moisture = 201;
        station.tick(28_001).unwrap();
        assert!(station
            .screen
            .drawn
            .contains(&Drawn::Standby(Some(Mood::Happy))));
        assert_eq!(station.board.relay.last(), Some(&false));
    }

    #[test]
    fn button_c_selects_mode_three() {
        let mut station = started();
        station.tick(20_001).unwrap();
        station.screen.drawn.clear();

        station.board.buttons = EnumSet::only(ModeButton::C);
        station.board.moisture = 450;
        station.tick(21_000).unwrap();

        assert_eq!(station.mode(), PlantMode::High);
        assert_eq!(station.board.pauses, vec![1_000]);
        assert_eq!(station.screen.drawn[0], Drawn::Banner(PlantMode::High));
        assert_eq!(station.screen.drawn[2], Drawn::Panel);
        assert_eq!(station.panel(), Panel::Live { since_ms: 21_000 });
        assert_eq!(station.status(), Some(WateringStatus::BaldGiessen));

        station.board.buttons = EnumSet::empty();
        station.board.moisture = 401;
        station.board.distance_mm = 10;
        station.tick(25_000).unwrap();
        assert_eq!(station.status(), Some(WateringStatus::Giessen));
    }

    #[test]
    fn log_rows_only_for_valid_samples() {
        let mut station = started();
        station.board.distance_mm = 50;

        station.board.climate.temperature = f32::NAN;
        station.tick(4_000).unwrap();
        assert!(station.logger.store().lines.is_empty());

        station.board.climate.temperature = 19.25;
        station.tick(8_000).unwrap();
        assert_eq!(
            station.logger.store().lines,
            vec!["08:30:00,300,19.25,45.00".to_owned()]
        );
    }

    #[test]
    fn telemetry_falls_back_to_default_location() {
        let mut station = started();
        station.board.distance_mm = 50;

        station.tick(59_999).unwrap();
        assert!(station.transport.sent.is_empty());

        station.tick(60_000).unwrap();
        assert_eq!(station.transport.sent.len(), 1);

        let value: serde_json::Value = serde_json::from_str(&station.transport.sent[0]).unwrap();
        assert_eq!(value["deviceId"], "Wio");
        assert_eq!(value["latitude"], 47.06895);
        assert_eq!(value["longitude"], 15.40643);
        assert_eq!(value["moisture"], 300);
    }

    #[test]
    fn telemetry_uses_gps_fix() {
        let mut station = started();
        station.gps.fix = Some(Coordinates {
            latitude: 48.2,
            longitude: 16.37,
        });

        station.tick(60_000).unwrap();

        let value: serde_json::Value = serde_json::from_str(&station.transport.sent[0]).unwrap();
        assert_eq!(value["latitude"], 48.2);
        assert_eq!(value["longitude"], 16.37);
    }

    #[test]
    fn transport_pumped_every_tick() {
        let mut station = started();
        for now in 1..=5 {
            station.tick(now).unwrap();
        }
        assert_eq!(station.transport.pumps, 5);
        assert_eq!(station.gps.drains, 5);
    }

    #[test]
    fn broken_screen_does_not_stop_watering() {
        let mut station = started();
        station.screen.broken = true;
        station.board.distance_mm = 50;
        station.board.moisture = 5;

        for now in (1_000..=120_000).step_by(1_000) {
            station.tick(now).unwrap();
        }

        assert_eq!(station.status(), Some(WateringStatus::Giessen));
        assert_eq!(station.board.relay.iter().filter(|on| **on).count(), 30);
        assert_eq!(station.logger.store().lines.len(), 30);
        assert_eq!(station.transport.sent.len(), 2);
        assert_eq!(station.transport.pumps, 120);
        assert!(station.screen.drawn.is_empty());
    }

    #[test]
    fn broken_banner_still_switches_mode() {
        let mut station = started();
        station.screen.broken = true;
        station.board.buttons = EnumSet::only(ModeButton::B);
        station.board.moisture = 150;

        station.tick(5_000).unwrap();

        assert_eq!(station.mode(), PlantMode::Medium);
        assert_eq!(station.panel(), Panel::Live { since_ms: 5_000 });
        assert_eq!(station.status(), Some(WateringStatus::Giessen));
        assert_eq!(station.board.relay.last(), Some(&true));
    }

    #[test]
    fn clock_ticks_every_second_while_live() {
        let mut station = started();
        station.board.distance_mm = 50;

        for now in (0..=3_500).step_by(500) {
            station.tick(now).unwrap();
        }

        let clocks = station
            .screen
            .drawn
            .iter()
            .filter(|d| **d == Drawn::Clock)
            .count();
        assert_eq!(clocks, 3);
    }
}
