use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;

use gnd_dictionary::{Dictionary, DictionaryError, MockDictionary, StaticDictionary};
use gnd_link::{Link, LinkError, LinkResult, MockLink};
use gnd_store::{Delivery, FieldMap, FieldValue, LocalStore, Store, StoreResult};
use gnd_types::{
    InterfaceState, InterfaceStatus, ItemReading, ItemValue, Packet, UNKNOWN,
};

use crate::{
    CmdWorker, ExceptionSink, InterfaceHandle, InterfaceMicroservice, PacketHandler, Supervisor,
    HAZARDOUS_ERROR, SUCCESS,
};

const SCOPE: &str = "DEFAULT";
const INTERFACE: &str = "INST_INT";

static ABORT_COMMAND: Lazy<Packet> = Lazy::new(|| {
    let mut command = Packet::named("INST", "ABORT");
    command.buffer = vec![0x1A, 0xCF, 0xFC, 0x1D];
    command.received_count = 1;
    command
        .items
        .push(ItemReading::raw("CCSDSVER", ItemValue::Int(0)));
    command.items.push(ItemReading {
        name: "PKTID".to_string(),
        raw: ItemValue::Int(30),
        converted: None,
        formatted: Some("0x1E".to_string()),
        with_units: None,
    });
    command
});

/// Link test double driven by a queue of read results. Once the queue
/// drains, reads park forever.
struct ScriptedLink {
    connected: AtomicBool,
    connects: AtomicUsize,
    reads: Mutex<VecDeque<LinkResult<Option<Packet>>>>,
    raw_writes: Mutex<Vec<Vec<u8>>>,
    auto_reconnect: bool,
    reconnect_delay: Duration,
    read_allowed: bool,
}

impl ScriptedLink {
    fn new(reads: Vec<LinkResult<Option<Packet>>>) -> Self {
        Self {
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            reads: Mutex::new(reads.into()),
            raw_writes: Mutex::new(Vec::new()),
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(2),
            read_allowed: true,
        }
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Link for ScriptedLink {
    async fn connect(&self) -> LinkResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> LinkResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn read(&self) -> LinkResult<Option<Packet>> {
        let next = self.reads.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn write(&self, _command: &Packet) -> LinkResult<()> {
        Ok(())
    }

    async fn write_raw(&self, data: &[u8]) -> LinkResult<()> {
        self.raw_writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn read_allowed(&self) -> bool {
        self.read_allowed
    }

    fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }
}

/// Store test double recording state publications and topic writes.
#[derive(Default)]
struct RecordingStore {
    states: Mutex<Vec<InterfaceState>>,
    writes: Mutex<Vec<(String, FieldMap)>>,
}

impl RecordingStore {
    fn states(&self) -> Vec<InterfaceState> {
        self.states.lock().unwrap().clone()
    }

    fn writes(&self) -> Vec<(String, FieldMap)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn recv_command(&self, _interface: &str, _scope: &str) -> StoreResult<Option<Delivery>> {
        std::future::pending().await
    }

    async fn write_topic(&self, topic: &str, fields: FieldMap) -> StoreResult<()> {
        self.writes
            .lock()
            .unwrap()
            .push((topic.to_string(), fields));
        Ok(())
    }

    async fn set_interface(
        &self,
        status: &InterfaceStatus,
        _scope: &str,
        _initialize: bool,
    ) -> StoreResult<()> {
        self.states.lock().unwrap().push(status.state);
        Ok(())
    }
}

#[derive(Default)]
struct CountingSink {
    reports: Mutex<Vec<String>>,
}

impl CountingSink {
    fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl ExceptionSink for CountingSink {
    fn write_exception(
        &self,
        _interface: &str,
        context: &str,
        detail: &str,
    ) -> io::Result<PathBuf> {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{context}: {detail}"));
        Ok(PathBuf::from("/dev/null"))
    }
}

fn supervisor<L, D, S>(
    link: Arc<L>,
    dictionary: Arc<D>,
    store: Arc<S>,
    reporter: Arc<dyn ExceptionSink>,
) -> Arc<Supervisor<L, D, S>>
where
    L: Link,
    D: Dictionary,
    S: Store,
{
    let interface = Arc::new(InterfaceHandle::new(INTERFACE, vec!["INST".to_string()]));
    Arc::new(Supervisor::new(
        interface,
        link,
        dictionary,
        store,
        SCOPE,
        CancellationToken::new(),
        reporter,
    ))
}

fn abort_fields() -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("target_name".to_string(), "INST".into());
    fields.insert("cmd_name".to_string(), "ABORT".into());
    fields.insert("cmd_params".to_string(), "{}".into());
    fields.insert("range_check".to_string(), "true".into());
    fields.insert("raw".to_string(), "false".into());
    fields.insert("hazardous_check".to_string(), "true".into());
    fields
}

fn spawn_worker<L, D>(link: Arc<L>, dictionary: Arc<D>, store: Arc<LocalStore>)
where
    L: Link + 'static,
    D: Dictionary + 'static,
{
    let supervisor = supervisor(
        link.clone(),
        dictionary.clone(),
        store.clone(),
        Arc::new(CountingSink::default()),
    );
    let worker = CmdWorker::new(supervisor, link, dictionary, store, SCOPE);
    tokio::spawn(worker.run());
}

#[tokio::test]
async fn test_successful_command_publishes_echoes() {
    let mut dictionary = MockDictionary::new();
    dictionary
        .expect_build_cmd()
        .withf(|target, name, _, range_check, raw| {
            target == "INST" && name == "ABORT" && *range_check && !*raw
        })
        .returning(|_, _, _, _, _| Ok(ABORT_COMMAND.clone()));
    dictionary.expect_cmd_hazardous().returning(|_| Ok(None));

    let mut link = MockLink::new();
    link.expect_write().times(1).returning(|_| Ok(()));

    let store = Arc::new(LocalStore::new());
    let command_rx = store.subscribe("DEFAULT__COMMAND__INST__ABORT");
    let decom_rx = store.subscribe("DEFAULT__DECOMCMD__INST__ABORT");

    spawn_worker(Arc::new(link), Arc::new(dictionary), store.clone());
    let reply = store
        .send_command(INTERFACE, SCOPE, abort_fields())
        .unwrap();
    assert_eq!(reply.await.unwrap(), SUCCESS);

    let echo = command_rx.recv_async().await.unwrap();
    assert!(matches!(echo.get("time"), Some(FieldValue::Int(_))));
    assert_eq!(echo.get("target_name"), Some(&"INST".into()));
    assert_eq!(echo.get("packet_name"), Some(&"ABORT".into()));
    assert_eq!(echo.get("received_count"), Some(&FieldValue::Int(1)));
    assert_eq!(
        echo.get("buffer"),
        Some(&FieldValue::Bytes(vec![0x1A, 0xCF, 0xFC, 0x1D]))
    );

    let decom = decom_rx.recv_async().await.unwrap();
    assert!(decom.get("buffer").is_none());
    let json_data: serde_json::Value =
        serde_json::from_str(decom.get("json_data").unwrap().as_str().unwrap()).unwrap();
    assert_eq!(
        json_data,
        serde_json::json!({"CCSDSVER": 0, "PKTID": 30, "PKTID__F": "0x1E"})
    );
}

#[tokio::test]
async fn test_hazardous_command_vetoed() {
    let mut dictionary = MockDictionary::new();
    dictionary
        .expect_build_cmd()
        .returning(|_, _, _, _, _| Ok(ABORT_COMMAND.clone()));
    dictionary
        .expect_cmd_hazardous()
        .returning(|_| Ok(Some("Aborts the current sequence".to_string())));

    let mut link = MockLink::new();
    link.expect_write().times(0);

    let store = Arc::new(LocalStore::new());
    let command_rx = store.subscribe("DEFAULT__COMMAND__INST__ABORT");

    spawn_worker(Arc::new(link), Arc::new(dictionary), store.clone());
    let reply = store
        .send_command(INTERFACE, SCOPE, abort_fields())
        .unwrap();

    assert_eq!(reply.await.unwrap(), HAZARDOUS_ERROR);
    assert!(command_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unparsable_params_reported_verbatim() {
    let dictionary = MockDictionary::new();
    let mut link = MockLink::new();
    link.expect_write().times(0);

    let store = Arc::new(LocalStore::new());
    spawn_worker(Arc::new(link), Arc::new(dictionary), store.clone());

    let mut fields = abort_fields();
    fields.insert("cmd_params".to_string(), "{not json".into());
    let reply = store.send_command(INTERFACE, SCOPE, fields).unwrap();

    let expected = serde_json::from_str::<serde_json::Value>("{not json")
        .unwrap_err()
        .to_string();
    assert_eq!(reply.await.unwrap(), expected);
}

#[tokio::test]
async fn test_build_failure_reported_verbatim() {
    let mut dictionary = MockDictionary::new();
    dictionary.expect_build_cmd().returning(|target, name, _, _, _| {
        Err(DictionaryError::UnknownPacket {
            target: target.to_string(),
            packet: name.to_string(),
        })
    });

    let mut link = MockLink::new();
    link.expect_write().times(0);

    let store = Arc::new(LocalStore::new());
    spawn_worker(Arc::new(link), Arc::new(dictionary), store.clone());

    let reply = store
        .send_command(INTERFACE, SCOPE, abort_fields())
        .unwrap();
    assert_eq!(reply.await.unwrap(), "packet INST ABORT is not defined");
}

#[tokio::test]
async fn test_lifecycle_connect_disconnect_and_raw() {
    let link = Arc::new(ScriptedLink {
        reconnect_delay: Duration::from_millis(10),
        ..ScriptedLink::new(vec![])
    });
    let dictionary = Arc::new(MockDictionary::new());
    let store = Arc::new(LocalStore::new());

    let supervisor = supervisor(
        link.clone(),
        dictionary.clone(),
        store.clone(),
        Arc::new(CountingSink::default()),
    );
    let interface = supervisor.interface().clone();
    let worker = CmdWorker::new(
        supervisor,
        link.clone(),
        dictionary,
        store.clone(),
        SCOPE,
    );
    tokio::spawn(worker.run());

    let mut fields = FieldMap::new();
    fields.insert("connect".to_string(), "".into());
    let reply = store.send_lifecycle(INTERFACE, SCOPE, fields).unwrap();
    assert_eq!(reply.await.unwrap(), SUCCESS);
    assert_eq!(link.connects(), 1);
    assert_eq!(interface.state(), InterfaceState::Connected);

    let mut fields = FieldMap::new();
    fields.insert("disconnect".to_string(), "".into());
    let reply = store.send_lifecycle(INTERFACE, SCOPE, fields).unwrap();
    assert_eq!(reply.await.unwrap(), SUCCESS);
    assert!(!link.connected().await);
    assert_eq!(interface.state(), InterfaceState::Disconnected);

    let mut fields = FieldMap::new();
    fields.insert("raw".to_string(), vec![0xAA, 0xBB].into());
    let reply = store.send_lifecycle(INTERFACE, SCOPE, fields).unwrap();
    assert_eq!(reply.await.unwrap(), SUCCESS);
    assert_eq!(*link.raw_writes.lock().unwrap(), vec![vec![0xAA, 0xBB]]);
}

#[tokio::test]
async fn test_inject_tlm_feeds_packet_path() {
    let link = Arc::new(ScriptedLink::new(vec![]));
    let mut dictionary = MockDictionary::new();
    dictionary.expect_packet().returning(|target, name| {
        let mut template = Packet::named(target, name);
        template
            .items
            .push(ItemReading::raw("TEMP1", ItemValue::Int(0)));
        Ok(template)
    });
    dictionary
        .expect_update()
        .withf(|target, name, _| target == "INST" && name == "HEALTH_STATUS")
        .returning(|target, name, _| Ok(Packet::named(target, name)));

    let store = Arc::new(LocalStore::new());
    let telemetry_rx = store.subscribe("DEFAULT__TELEMETRY__INST__HEALTH_STATUS");

    spawn_worker(link, Arc::new(dictionary), store.clone());

    let mut fields = FieldMap::new();
    fields.insert("inject_tlm".to_string(), "true".into());
    fields.insert("target_name".to_string(), "INST".into());
    fields.insert("packet_name".to_string(), "HEALTH_STATUS".into());
    fields.insert("item_hash".to_string(), r#"{"TEMP1": 42}"#.into());
    fields.insert("type".to_string(), "RAW".into());
    let reply = store.send_lifecycle(INTERFACE, SCOPE, fields).unwrap();

    assert_eq!(reply.await.unwrap(), SUCCESS);
    let entry = telemetry_rx.recv_async().await.unwrap();
    assert_eq!(entry.get("packet_name"), Some(&"HEALTH_STATUS".into()));
    assert_eq!(entry.get("received_count"), Some(&FieldValue::Int(1)));
}

#[tokio::test]
async fn test_unknown_packet_downgraded_and_published() {
    let mut dictionary = MockDictionary::new();
    dictionary.expect_identify().returning(|_, _| Ok(None));
    dictionary
        .expect_update()
        .withf(|target, name, _| target == UNKNOWN && name == UNKNOWN)
        .returning(|_, _, buffer| {
            let mut packet = Packet::named(UNKNOWN, UNKNOWN);
            packet.buffer = buffer.to_vec();
            Ok(packet)
        });

    let store = Arc::new(RecordingStore::default());
    let interface = Arc::new(InterfaceHandle::new(INTERFACE, vec!["INST".to_string()]));
    let handler = PacketHandler::new(interface, Arc::new(dictionary), store.clone(), SCOPE);

    let buffer: Vec<u8> = (1..=20).collect();
    handler
        .handle(Packet::from_buffer(buffer.clone()))
        .await
        .unwrap();

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    let (topic, fields) = &writes[0];
    assert_eq!(topic, "DEFAULT__TELEMETRY__UNKNOWN__UNKNOWN");
    assert_eq!(fields.get("buffer"), Some(&FieldValue::Bytes(buffer)));
    assert_eq!(fields.get("received_count"), Some(&FieldValue::Int(1)));
    assert_eq!(fields.get("stored"), Some(&"false".into()));
}

#[tokio::test]
async fn test_stored_packet_bypasses_cvt() {
    let mut dictionary = MockDictionary::new();
    dictionary.expect_update().times(0);
    dictionary.expect_identify().times(0);
    dictionary
        .expect_identify_and_define()
        .returning(|packet, _| {
            let mut identified = Packet::named("INST", "ADCS");
            identified.buffer = packet.buffer;
            Ok(Some(identified))
        });

    let store = Arc::new(RecordingStore::default());
    let interface = Arc::new(InterfaceHandle::new(INTERFACE, vec!["INST".to_string()]));
    let handler = PacketHandler::new(interface, Arc::new(dictionary), store.clone(), SCOPE);

    let mut packet = Packet::from_buffer(vec![7, 7]);
    packet.stored = true;
    handler.handle(packet).await.unwrap();

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "DEFAULT__TELEMETRY__INST__ADCS");
    assert_eq!(writes[0].1.get("stored"), Some(&"true".into()));
}

#[tokio::test]
async fn test_unidentifiable_stored_packet_skips_cvt() {
    let mut dictionary = MockDictionary::new();
    dictionary.expect_update().times(0);
    dictionary.expect_identify().times(0);
    dictionary
        .expect_identify_and_define()
        .returning(|_, _| Ok(None));

    let store = Arc::new(RecordingStore::default());
    let interface = Arc::new(InterfaceHandle::new(INTERFACE, vec!["INST".to_string()]));
    let handler = PacketHandler::new(interface, Arc::new(dictionary), store.clone(), SCOPE);

    let mut packet = Packet::from_buffer(vec![0xDE, 0xAD]);
    packet.stored = true;
    handler.handle(packet).await.unwrap();

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    let (topic, fields) = &writes[0];
    assert_eq!(topic, "DEFAULT__TELEMETRY__UNKNOWN__UNKNOWN");
    assert_eq!(fields.get("stored"), Some(&"true".into()));
    assert_eq!(
        fields.get("buffer"),
        Some(&FieldValue::Bytes(vec![0xDE, 0xAD]))
    );
}

#[tokio::test]
async fn test_stale_identification_falls_back_to_identify() {
    let mut dictionary = MockDictionary::new();
    dictionary.expect_update().times(1).returning(|target, name, _| {
        Err(DictionaryError::UnknownPacket {
            target: target.to_string(),
            packet: name.to_string(),
        })
    });
    dictionary
        .expect_identify()
        .times(1)
        .returning(|buffer, _| {
            let mut packet = Packet::named("INST", "ADCS");
            packet.buffer = buffer.to_vec();
            Ok(Some(packet))
        });

    let store = Arc::new(RecordingStore::default());
    let interface = Arc::new(InterfaceHandle::new(INTERFACE, vec!["INST".to_string()]));
    let handler = PacketHandler::new(interface, Arc::new(dictionary), store.clone(), SCOPE);

    let mut packet = Packet::from_buffer(vec![1, 2, 3]);
    packet.target_name = Some("INST".to_string());
    packet.packet_name = Some("REMOVED".to_string());
    handler.handle(packet).await.unwrap();

    assert_eq!(store.writes()[0].0, "DEFAULT__TELEMETRY__INST__ADCS");
}

#[tokio::test]
async fn test_other_update_failures_propagate() {
    let mut dictionary = MockDictionary::new();
    dictionary
        .expect_update()
        .returning(|_, _, _| Err(DictionaryError::Build("dictionary offline".to_string())));
    dictionary.expect_identify().times(0);

    let store = Arc::new(RecordingStore::default());
    let interface = Arc::new(InterfaceHandle::new(INTERFACE, vec!["INST".to_string()]));
    let handler = PacketHandler::new(interface, Arc::new(dictionary), store.clone(), SCOPE);

    let mut packet = Packet::from_buffer(vec![1]);
    packet.target_name = Some("INST".to_string());
    packet.packet_name = Some("ADCS".to_string());

    assert!(handler.handle(packet).await.is_err());
    assert!(store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clean_disconnect_reconnects_after_delay() {
    let link = Arc::new(ScriptedLink::new(vec![
        Ok(None),
        Ok(Some(Packet::from_buffer(vec![0x10, 0x01]))),
    ]));
    let mut dictionary = MockDictionary::new();
    dictionary.expect_identify().returning(|buffer, _| {
        let mut packet = Packet::named("INST", "HEALTH_STATUS");
        packet.buffer = buffer.to_vec();
        Ok(Some(packet))
    });

    let store = Arc::new(RecordingStore::default());
    let supervisor = supervisor(
        link.clone(),
        Arc::new(dictionary),
        store.clone(),
        Arc::new(CountingSink::default()),
    );

    let running = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    let mut telemetry = None;
    for _ in 0..500 {
        telemetry = store
            .writes()
            .into_iter()
            .find(|(topic, _)| topic.contains("TELEMETRY"));
        if telemetry.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let (topic, _) = telemetry.expect("telemetry should be published after reconnecting");
    assert_eq!(topic, "DEFAULT__TELEMETRY__INST__HEALTH_STATUS");
    assert_eq!(link.connects(), 2);

    use InterfaceState::*;
    assert_eq!(
        store.states(),
        vec![Attempting, Connected, Disconnected, Attempting, Connected, Connected]
    );

    supervisor.stop().await;
    running.abort();
}

#[tokio::test]
async fn test_no_connect_after_stop() {
    let link = Arc::new(ScriptedLink::new(vec![]));
    let supervisor = supervisor(
        link.clone(),
        Arc::new(MockDictionary::new()),
        Arc::new(RecordingStore::default()),
        Arc::new(CountingSink::default()),
    );

    supervisor.stop().await;

    assert!(matches!(
        supervisor.connect().await,
        Err(LinkError::Canceled)
    ));
    assert_eq!(link.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_exits_after_stop_within_one_tick() {
    let link = Arc::new(ScriptedLink {
        read_allowed: false,
        ..ScriptedLink::new(vec![])
    });
    let supervisor = supervisor(
        link,
        Arc::new(MockDictionary::new()),
        Arc::new(RecordingStore::default()),
        Arc::new(CountingSink::default()),
    );

    let running = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.run().await }
    });

    tokio::task::yield_now().await;
    supervisor.stop().await;

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("read loop should exit within one sleeper tick")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_exception_reports_deduplicated_per_category() {
    let link = Arc::new(ScriptedLink {
        auto_reconnect: false,
        ..ScriptedLink::new(vec![])
    });
    let sink = Arc::new(CountingSink::default());
    let supervisor = supervisor(
        link,
        Arc::new(MockDictionary::new()),
        Arc::new(RecordingStore::default()),
        sink.clone(),
    );

    let framing = || LinkError::Protocol("frame length 4294967295 out of range".to_string());

    supervisor.handle_connection_failed(framing()).await;
    supervisor.handle_connection_failed(framing()).await;
    assert_eq!(sink.count(), 1, "same failure persists once per category");

    supervisor.handle_connection_lost(Some(framing())).await;
    assert_eq!(sink.count(), 2, "categories deduplicate independently");

    supervisor
        .handle_connection_lost(Some(LinkError::Timeout))
        .await;
    assert_eq!(sink.count(), 2, "transient failures are never persisted");
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_latches_shutdown() {
    let link = Arc::new(ScriptedLink::new(vec![]));
    let sink = Arc::new(CountingSink::default());
    let supervisor = supervisor(
        link.clone(),
        Arc::new(MockDictionary::new()),
        Arc::new(RecordingStore::default()),
        sink.clone(),
    );

    supervisor
        .handle_connection_lost(Some(LinkError::Interrupt))
        .await;

    assert_eq!(sink.count(), 0);
    assert!(matches!(
        supervisor.connect().await,
        Err(LinkError::Canceled)
    ));
    assert_eq!(link.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_microservice_end_to_end() {
    let link = Arc::new(ScriptedLink::new(vec![]));

    let mut dictionary = StaticDictionary::new();
    dictionary.define_command(
        "INST",
        "ABORT",
        gnd_dictionary::CmdDef {
            template: Packet::named("INST", "ABORT"),
            hazardous: None,
            ranges: Default::default(),
        },
    );

    let store = Arc::new(LocalStore::new());
    let microservice = InterfaceMicroservice::new(
        "DEFAULT__INTERFACE__INST_INT",
        vec!["INST".to_string()],
        link.clone(),
        Arc::new(dictionary),
        store.clone(),
        Arc::new(CountingSink::default()),
    )
    .unwrap()
    .with_shutdown_timeout(Duration::from_secs(1));

    microservice.start().await.unwrap();
    assert!(store.interface_status(INTERFACE, SCOPE).is_some());

    let mut fields = abort_fields();
    fields.insert("hazardous_check".to_string(), "false".into());
    let reply = store.send_command(INTERFACE, SCOPE, fields).unwrap();
    assert_eq!(reply.await.unwrap(), SUCCESS);

    store.close();
    microservice.shutdown().await;
}

#[test]
fn test_invalid_microservice_name_rejected() {
    let result = InterfaceMicroservice::new(
        "NOSCOPE",
        vec![],
        Arc::new(ScriptedLink::new(vec![])),
        Arc::new(MockDictionary::new()),
        Arc::new(LocalStore::new()),
        Arc::new(CountingSink::default()),
    );

    assert!(result.is_err());
}
