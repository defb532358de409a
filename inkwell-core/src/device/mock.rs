//! In-memory device registry for tests and offline rendering
//!
//! `MockDeviceClient` simulates a single registry: devices, models, screens
//! and playlists. A device's last-refresh timestamp can be scripted ahead of
//! time with [`MockDeviceClient::schedule_refresh`]; polls then report the
//! latest scheduled refresh that is not in the future according to the
//! client's [`Clock`]. Every call is recorded for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::client::DeviceClient;
use super::error::DeviceClientError;
use super::types::{DeviceRecord, DeviceUpdate, ModelRecord, NewScreen, ScreenRecord};
use crate::clock::{Clock, SystemClock};

/// A recorded client call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GetDevice { id: String },
    UpdateDevice { id: String, refresh_rate: u64 },
    GetModel { id: String },
    GetScreens,
    AddScreen { name: String },
    RemoveScreen { id: String },
    AddToPlaylist { playlist_id: String, screen_id: String },
}

#[derive(Default)]
struct MockState {
    devices: HashMap<String, DeviceRecord>,
    models: HashMap<String, ModelRecord>,
    screens: Vec<ScreenRecord>,
    screen_content: HashMap<String, String>,
    playlists: HashMap<String, Vec<String>>,
    refreshes: HashMap<String, Vec<DateTime<Utc>>>,
    calls: Vec<MockCall>,
    failures: VecDeque<DeviceClientError>,
    rate_update_failures: HashMap<u64, usize>,
    next_screen_id: u64,
}

/// Scriptable in-memory [`DeviceClient`]
pub struct MockDeviceClient {
    state: Mutex<MockState>,
    clock: Arc<dyn Clock>,
}

impl MockDeviceClient {
    /// Empty registry on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty registry evaluating scheduled refreshes against `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MockState {
                next_screen_id: 1,
                ..Default::default()
            }),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_device(&self, device: DeviceRecord) {
        self.lock().devices.insert(device.id.clone(), device);
    }

    pub fn insert_model(&self, model: ModelRecord) {
        self.lock().models.insert(model.id.clone(), model);
    }

    /// Pre-existing screen, e.g. left over from a previous run
    pub fn insert_screen(&self, screen: ScreenRecord) {
        self.lock().screens.push(screen);
    }

    /// Make the device report a refresh at `at` once the clock reaches it
    pub fn schedule_refresh(&self, device_id: &str, at: DateTime<Utc>) {
        self.lock()
            .refreshes
            .entry(device_id.to_string())
            .or_default()
            .push(at);
    }

    /// Fail the next call (of any kind) with `error`; failures queue up
    pub fn fail_next(&self, error: DeviceClientError) {
        self.lock().failures.push_back(error);
    }

    /// Time out the next `count` updates that set the rate to `rate`.
    /// Other calls are unaffected; zero clears the budget.
    pub fn fail_rate_updates(&self, rate: u64, count: usize) {
        self.lock().rate_update_failures.insert(rate, count);
    }

    /// Current device record as a poll would see it, without recording a call
    pub fn device(&self, id: &str) -> Option<DeviceRecord> {
        let now = self.clock.now();
        let state = self.lock();
        state.devices.get(id).map(|d| observed(&state, d, now))
    }

    pub fn screens(&self) -> Vec<ScreenRecord> {
        self.lock().screens.clone()
    }

    /// Base64 content uploaded for a screen
    pub fn screen_content(&self, screen_id: &str) -> Option<String> {
        self.lock().screen_content.get(screen_id).cloned()
    }

    pub fn playlist(&self, playlist_id: &str) -> Vec<String> {
        self.lock()
            .playlists
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Refresh-rate writes, in order
    pub fn rate_updates(&self) -> Vec<u64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::UpdateDevice { refresh_rate, .. } => Some(*refresh_rate),
                _ => None,
            })
            .collect()
    }

    fn begin(&self, call: MockCall) -> Result<MutexGuard<'_, MockState>, DeviceClientError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

impl Default for MockDeviceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn observed(state: &MockState, device: &DeviceRecord, now: DateTime<Utc>) -> DeviceRecord {
    let mut device = device.clone();
    if let Some(latest) = state
        .refreshes
        .get(&device.id)
        .and_then(|r| r.iter().filter(|t| **t <= now).max())
        && *latest > device.updated_at
    {
        device.updated_at = *latest;
    }
    device
}

#[async_trait]
impl DeviceClient for MockDeviceClient {
    async fn get_device(&self, id: &str) -> Result<DeviceRecord, DeviceClientError> {
        let now = self.clock.now();
        let state = self.begin(MockCall::GetDevice { id: id.to_string() })?;
        state
            .devices
            .get(id)
            .map(|d| observed(&state, d, now))
            .ok_or_else(|| DeviceClientError::NotFound {
                kind: "device",
                id: id.to_string(),
            })
    }

    async fn update_device(
        &self,
        id: &str,
        update: DeviceUpdate,
    ) -> Result<(), DeviceClientError> {
        let mut state = self.begin(MockCall::UpdateDevice {
            id: id.to_string(),
            refresh_rate: update.refresh_rate,
        })?;
        if let Some(remaining) = state.rate_update_failures.get_mut(&update.refresh_rate)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(DeviceClientError::Timeout);
        }
        let device = state
            .devices
            .get_mut(id)
            .ok_or_else(|| DeviceClientError::NotFound {
                kind: "device",
                id: id.to_string(),
            })?;
        device.refresh_rate = update.refresh_rate;
        Ok(())
    }

    async fn get_model(&self, id: &str) -> Result<ModelRecord, DeviceClientError> {
        let state = self.begin(MockCall::GetModel { id: id.to_string() })?;
        state
            .models
            .get(id)
            .cloned()
            .ok_or_else(|| DeviceClientError::NotFound {
                kind: "model",
                id: id.to_string(),
            })
    }

    async fn get_screens(&self) -> Result<Vec<ScreenRecord>, DeviceClientError> {
        let state = self.begin(MockCall::GetScreens)?;
        Ok(state.screens.clone())
    }

    async fn add_screen(&self, screen: NewScreen) -> Result<String, DeviceClientError> {
        let mut state = self.begin(MockCall::AddScreen {
            name: screen.name.clone(),
        })?;
        let id = state.next_screen_id.to_string();
        state.next_screen_id += 1;
        state.screens.push(ScreenRecord {
            id: id.clone(),
            name: screen.name,
            label: Some(screen.label),
        });
        state.screen_content.insert(id.clone(), screen.content);
        Ok(id)
    }

    async fn remove_screen(&self, id: &str) -> Result<(), DeviceClientError> {
        let mut state = self.begin(MockCall::RemoveScreen { id: id.to_string() })?;
        let before = state.screens.len();
        state.screens.retain(|s| s.id != id);
        if state.screens.len() == before {
            return Err(DeviceClientError::NotFound {
                kind: "screen",
                id: id.to_string(),
            });
        }
        state.screen_content.remove(id);
        for items in state.playlists.values_mut() {
            items.retain(|s| s != id);
        }
        Ok(())
    }

    async fn add_screen_to_playlist(
        &self,
        playlist_id: &str,
        screen_id: &str,
    ) -> Result<(), DeviceClientError> {
        let mut state = self.begin(MockCall::AddToPlaylist {
            playlist_id: playlist_id.to_string(),
            screen_id: screen_id.to_string(),
        })?;
        state
            .playlists
            .entry(playlist_id.to_string())
            .or_default()
            .push(screen_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use chrono::TimeZone;
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    fn device(updated_at: DateTime<Utc>) -> DeviceRecord {
        DeviceRecord {
            id: "1".into(),
            friendly_id: "ABC".into(),
            refresh_rate: 300,
            updated_at,
            playlist_id: Some("9".into()),
            model_id: "m".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_refresh_appears_when_due() {
        let clock = Arc::new(TokioClock::starting_at(t0()));
        let mock = MockDeviceClient::with_clock(clock);
        mock.insert_device(device(t0()));
        mock.schedule_refresh("1", t0() + chrono::Duration::seconds(300));

        assert_eq!(mock.get_device("1").await.unwrap().updated_at, t0());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(
            mock.get_device("1").await.unwrap().updated_at,
            t0() + chrono::Duration::seconds(300)
        );
    }

    #[tokio::test]
    async fn queued_failures_are_consumed_in_order() {
        let mock = MockDeviceClient::new();
        mock.insert_device(device(t0()));
        mock.fail_next(DeviceClientError::Timeout);

        assert_eq!(mock.get_device("1").await, Err(DeviceClientError::Timeout));
        assert!(mock.get_device("1").await.is_ok());
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn update_device_changes_rate() {
        let mock = MockDeviceClient::new();
        mock.insert_device(device(t0()));
        mock.update_device("1", DeviceUpdate { refresh_rate: 60 })
            .await
            .unwrap();

        assert_eq!(mock.device("1").unwrap().refresh_rate, 60);
        assert_eq!(mock.rate_updates(), vec![60]);
    }

    #[tokio::test]
    async fn rate_update_failures_only_hit_matching_rate() {
        let mock = MockDeviceClient::new();
        mock.insert_device(device(t0()));
        mock.fail_rate_updates(900, 1);

        mock.update_device("1", DeviceUpdate { refresh_rate: 60 })
            .await
            .unwrap();
        assert_eq!(
            mock.update_device("1", DeviceUpdate { refresh_rate: 900 }).await,
            Err(DeviceClientError::Timeout)
        );
        assert!(mock.get_device("1").await.is_ok());
        mock.update_device("1", DeviceUpdate { refresh_rate: 900 })
            .await
            .unwrap();

        assert_eq!(mock.device("1").unwrap().refresh_rate, 900);
        assert_eq!(mock.rate_updates(), vec![60, 900, 900]);
    }

    #[tokio::test]
    async fn removing_screen_detaches_it_from_playlists() {
        let mock = MockDeviceClient::new();
        let id = mock
            .add_screen(NewScreen {
                content: "AAAA".into(),
                name: "clock_ABC_1".into(),
                label: "clock".into(),
                file_name: "clock_ABC_1.png".into(),
                model_id: "m".into(),
            })
            .await
            .unwrap();
        mock.add_screen_to_playlist("9", &id).await.unwrap();
        assert_eq!(mock.playlist("9"), vec![id.clone()]);

        mock.remove_screen(&id).await.unwrap();
        assert!(mock.playlist("9").is_empty());
        assert!(mock.screens().is_empty());
        assert!(matches!(
            mock.remove_screen(&id).await,
            Err(DeviceClientError::NotFound { .. })
        ));
    }
}
