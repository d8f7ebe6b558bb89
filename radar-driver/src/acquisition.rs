use crate::assembler::SweepAssembler;
use crate::channel::ScanSender;
use crate::constants::READ_CHUNK_SIZE;
use crate::decoder::decode;
use crate::error::RadarError;
use crate::handoff::ConfigHandoff;
use crate::line::LineBuffer;
use crate::transport::{read_chunk, ReadOutcome, Transport};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use crossbeam_utils::atomic::AtomicCell;
use radar_data::{ConnectionState, ScanItem};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, info_span, warn};

/// What the acquisition thread takes over for one connection.
pub(crate) struct Session {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) label: String,
    pub(crate) handoff: ConfigHandoff,
    pub(crate) scan_tx: ScanSender,
    pub(crate) max_line_bytes: usize,
}

/// Handle to one acquisition thread.
///
/// State and error slot belong to this session alone, so a thread detached
/// after a timed-out stop cannot touch the session that replaces it.
pub(crate) struct AcquisitionThread {
    terminator_tx: Sender<bool>,
    done_rx: Receiver<()>,
    thread: Option<JoinHandle<()>>,
    state: Arc<AtomicCell<ConnectionState>>,
    last_error: Arc<Mutex<Option<RadarError>>>,
}

pub(crate) fn spawn(session: Session) -> AcquisitionThread {
    let (terminator_tx, terminator_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(1);
    let state = Arc::new(AtomicCell::new(ConnectionState::Connected));
    let last_error = Arc::new(Mutex::new(None));

    let thread_state = state.clone();
    let thread_error = last_error.clone();
    let thread = std::thread::spawn(move || {
        let Session {
            mut transport,
            label,
            handoff,
            scan_tx,
            max_line_bytes,
        } = session;
        let _span = info_span!("acquisition", port = %label).entered();

        let result = read_lines(
            transport.as_mut(),
            &handoff,
            &scan_tx,
            &terminator_rx,
            max_line_bytes,
        );
        if let Err(e) = result {
            warn!("{e}");
            *thread_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
        }
        drop(transport);
        thread_state.store(ConnectionState::Disconnected);
        info!("acquisition stopped");
        // The handle may already be gone after a timed-out stop.
        let _ = done_tx.send(());
    });

    AcquisitionThread {
        terminator_tx,
        done_rx,
        thread: Some(thread),
        state,
        last_error,
    }
}

impl AcquisitionThread {
    pub(crate) fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// `false` once the loop has ended, by request or by transport loss.
    pub(crate) fn is_running(&self) -> bool {
        self.state.load() != ConnectionState::Disconnected
    }

    pub(crate) fn take_error(&self) -> Option<RadarError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Asks the loop to stop and waits up to `grace` for it. Returns `false`
    /// when the thread did not exit in time; it then exits without forwarding
    /// anything once its current read returns.
    pub(crate) fn stop(&mut self, grace: Duration) -> bool {
        if self.is_running() {
            self.state.store(ConnectionState::Disconnecting);
        }
        let _ = self.terminator_tx.try_send(true);
        match self.done_rx.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        warn!("acquisition thread panicked");
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// Reads until asked to stop or until the transport fails.
///
/// Returns `Ok(())` on a requested stop and `Err(TransportLost)` when the
/// transport reports end of stream or a read error other than a timeout.
pub(crate) fn read_lines(
    transport: &mut dyn Transport,
    handoff: &ConfigHandoff,
    scan_tx: &ScanSender,
    terminator_rx: &Receiver<bool>,
    max_line_bytes: usize,
) -> Result<(), RadarError> {
    let mut buffer = LineBuffer::new(max_line_bytes);
    let mut assembler = SweepAssembler::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        if do_terminate(terminator_rx) {
            return Ok(());
        }

        match read_chunk(&mut *transport, &mut chunk) {
            Ok(ReadOutcome::Data(n)) => buffer.extend(&chunk[..n]),
            Ok(ReadOutcome::Idle) => continue,
            Ok(ReadOutcome::Closed) => {
                return Err(RadarError::TransportLost(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "device closed the stream",
                )))
            }
            Err(e) => return Err(RadarError::TransportLost(e)),
        }
        // A stop may have been requested while the read was blocked.
        if do_terminate(terminator_rx) {
            return Ok(());
        }

        while let Some(line) = buffer.next_line() {
            if line.is_empty() {
                continue;
            }
            let Some(item) = assembler.push(decode(&line)) else {
                continue;
            };
            scan_tx.send(item);
            if item == ScanItem::SweepMarker {
                match handoff.flush(&mut *transport) {
                    Ok(config) => info!(
                        resolution = config.resolution(),
                        angle = config.angle(),
                        "sent sweep config"
                    ),
                    Err(e) => warn!("{e}"),
                }
            }
        }

        if let Some(n) = buffer.discard_overflow() {
            warn!(bytes = n, "discarded unterminated input");
        }
    }
}

/// `true` once a stop was requested or the handle was dropped.
pub(crate) fn do_terminate(terminator_rx: &Receiver<bool>) -> bool {
    match terminator_rx.try_recv() {
        Ok(terminate) => terminate,
        Err(TryRecvError::Empty) => false,
        Err(TryRecvError::Disconnected) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::scan_channel;
    use crate::constants::MAX_LINE_BYTES;
    use crate::transport::mock::{ScriptEnd, ScriptedTransport};
    use radar_data::{Sample, ScanConfig};

    fn config(resolution: u32, angle: u32) -> ScanConfig {
        ScanConfig::new(resolution, angle).unwrap()
    }

    /// Runs the loop over `transport` until it ends by itself.
    fn run_to_end(
        mut transport: ScriptedTransport,
        handoff: &ConfigHandoff,
    ) -> (Result<(), RadarError>, Vec<ScanItem>) {
        let (scan_tx, scan_rx) = scan_channel();
        let (_terminator_tx, terminator_rx) = bounded(1);
        let result = read_lines(
            &mut transport,
            handoff,
            &scan_tx,
            &terminator_rx,
            MAX_LINE_BYTES,
        );
        (result, scan_rx.poll_all())
    }

    fn written(transport: &ScriptedTransport) -> String {
        String::from_utf8(transport.written().lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_delimited_sweep() {
        let transport =
            ScriptedTransport::new(&["10,50", "20,55", "30,60", "END"], ScriptEnd::Eof);
        let (result, items) = run_to_end(transport, &ConfigHandoff::new(ScanConfig::default()));
        assert!(matches!(result, Err(RadarError::TransportLost(_))));
        assert_eq!(
            items,
            vec![
                ScanItem::Sample(Sample::new(10., 50.)),
                ScanItem::Sample(Sample::new(20., 55.)),
                ScanItem::Sample(Sample::new(30., 60.)),
                ScanItem::SweepMarker,
            ]
        );
    }

    #[test]
    fn test_structured_sweep() {
        let transport =
            ScriptedTransport::new(&[r#"{"Angle": 15, "Distance": 42}"#, "END"], ScriptEnd::Eof);
        let (_, items) = run_to_end(transport, &ConfigHandoff::new(ScanConfig::default()));
        assert_eq!(
            items,
            vec![ScanItem::Sample(Sample::new(15., 42.)), ScanItem::SweepMarker]
        );
    }

    #[test]
    fn test_malformed_line_skipped() {
        let transport = ScriptedTransport::new(&["abc,def", "10,50", "END"], ScriptEnd::Eof);
        let (_, items) = run_to_end(transport, &ConfigHandoff::new(ScanConfig::default()));
        assert_eq!(
            items,
            vec![ScanItem::Sample(Sample::new(10., 50.)), ScanItem::SweepMarker]
        );
    }

    #[test]
    fn test_lines_split_across_reads() {
        let transport = ScriptedTransport::from_chunks(
            vec![b"10,".to_vec(), b"50\r\n2".to_vec(), b"0,55\nEN".to_vec(), b"D\n".to_vec()],
            ScriptEnd::Eof,
        );
        let (_, items) = run_to_end(transport, &ConfigHandoff::new(ScanConfig::default()));
        assert_eq!(
            items,
            vec![
                ScanItem::Sample(Sample::new(10., 50.)),
                ScanItem::Sample(Sample::new(20., 55.)),
                ScanItem::SweepMarker,
            ]
        );
    }

    #[test]
    fn test_latest_config_sent_once_at_boundary() {
        let transport = ScriptedTransport::new(&["10,50", "END", "20,50"], ScriptEnd::Eof);
        let handoff = ConfigHandoff::new(ScanConfig::default());
        handoff.request(config(100, 90));
        handoff.request(config(200, 180));
        let written_buf = transport.written();

        run_to_end(transport, &handoff);
        let written = String::from_utf8(written_buf.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "{\"Angle\":180,\"Resolution\":200}\n");
        assert_eq!(handoff.applied(), config(200, 180));
        assert_eq!(handoff.pending(), None);
    }

    #[test]
    fn test_config_resent_every_boundary() {
        let transport = ScriptedTransport::new(&["END", "1,1", "END", "END"], ScriptEnd::Eof);
        let handoff = ConfigHandoff::new(config(90, 45));
        let written_buf = transport.written();

        run_to_end(transport, &handoff);
        let written = String::from_utf8(written_buf.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "{\"Angle\":45,\"Resolution\":90}\n".repeat(3));
    }

    #[test]
    fn test_config_write_failure_keeps_reading() {
        let transport = ScriptedTransport::new(&["1,1", "END", "2,2", "END"], ScriptEnd::Eof)
            .failing_writes();
        let handoff = ConfigHandoff::new(config(90, 45));
        handoff.request(config(10, 10));
        assert!(written(&transport).is_empty());

        let (result, items) = run_to_end(transport, &handoff);
        assert!(matches!(result, Err(RadarError::TransportLost(_))));
        assert_eq!(items.len(), 4);
        assert_eq!(handoff.applied(), config(90, 45));
        assert_eq!(handoff.pending(), None);
    }

    #[test]
    fn test_read_error_ends_loop() {
        let transport = ScriptedTransport::new(&["1,1"], ScriptEnd::Fail);
        let (result, items) = run_to_end(transport, &ConfigHandoff::new(ScanConfig::default()));
        assert!(matches!(
            result,
            Err(RadarError::TransportLost(e)) if e.kind() == io::ErrorKind::BrokenPipe
        ));
        assert_eq!(items, vec![ScanItem::Sample(Sample::new(1., 1.))]);
    }

    fn spawn_over(transport: ScriptedTransport, scan_tx: ScanSender) -> AcquisitionThread {
        spawn(Session {
            transport: Box::new(transport),
            label: "mock".to_string(),
            handoff: ConfigHandoff::new(ScanConfig::default()),
            scan_tx,
            max_line_bytes: MAX_LINE_BYTES,
        })
    }

    #[test]
    fn test_stop_request() {
        let (scan_tx, scan_rx) = scan_channel();
        let mut thread = spawn_over(
            ScriptedTransport::new(&["1,1", "END"], ScriptEnd::Idle),
            scan_tx,
        );

        while scan_rx.depth() < 2 {
            crate::time::sleep_ms(1);
        }
        assert!(thread.is_running());
        assert_eq!(thread.state(), ConnectionState::Connected);
        assert!(thread.stop(Duration::from_secs(1)));
        assert!(!thread.is_running());
        assert_eq!(thread.state(), ConnectionState::Disconnected);
        assert!(thread.take_error().is_none());
    }

    #[test]
    fn test_stop_timeout_forwards_nothing() {
        let (scan_tx, scan_rx) = scan_channel();
        let mut thread = spawn_over(
            ScriptedTransport::new(&["1,1", "END"], ScriptEnd::Idle).with_read_delay(300),
            scan_tx,
        );
        crate::time::sleep_ms(50);

        // the thread is blocked in its first read
        assert!(!thread.stop(Duration::from_millis(10)));
        assert_eq!(thread.state(), ConnectionState::Disconnecting);

        crate::time::sleep_ms(600);
        assert_eq!(thread.state(), ConnectionState::Disconnected);
        assert!(scan_rx.poll_all().is_empty());
        assert!(thread.take_error().is_none());
        assert!(thread.stop(Duration::from_millis(10)));
    }

    #[test]
    fn test_do_terminate() {
        let (tx, rx) = bounded(1);
        assert!(!do_terminate(&rx));
        tx.send(true).unwrap();
        assert!(do_terminate(&rx));
        drop(tx);
        assert!(do_terminate(&rx));
    }
}
