use std::{
    fs::File,
    io::BufReader,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioElement, MediaInfo, PlaybackError};

type Reply<T> = Sender<Result<T, PlaybackError>>;

enum TrackCommand {
    Load(Reply<MediaInfo>),
    Play(Reply<()>),
    Pause,
    Seek(f64, Reply<()>),
    Position(Sender<f64>),
    SetVolume(f32),
}

/// Background track played through the default output device.
///
/// rodio's output stream isn't `Send`, so a dedicated thread owns it and the
/// handle talks to it over a channel. Opening the device is deferred to the
/// first `play`; if no device is available yet the call reports
/// [`PlaybackError::Blocked`] and the protocol waits for a user gesture.
pub struct RodioTrack {
    path: PathBuf,
    tx: Mutex<Option<Sender<TrackCommand>>>,
    is_paused: Arc<AtomicBool>,
}

impl RodioTrack {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            tx: Mutex::new(None),
            is_paused: Arc::new(AtomicBool::new(true)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<TrackCommand>, PlaybackError> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|e| PlaybackError::Backend(e.to_string()))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<TrackCommand>();
        let is_paused = Arc::clone(&self.is_paused);
        let path = self.path.clone();

        thread::Builder::new()
            .name("audio-track".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut sink: Option<Sink> = None;
                let mut pending: Option<Decoder<BufReader<File>>> = None;
                let mut pending_seek: Option<f64> = None;
                let mut volume = 1.0_f32;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        TrackCommand::Load(reply) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            is_paused.store(true, Ordering::SeqCst);
                            let result = open_track(&path).map(|decoder| {
                                let duration = decoder
                                    .total_duration()
                                    .map(|d| d.as_secs_f64())
                                    .unwrap_or(f64::INFINITY);
                                pending = Some(decoder);
                                pending_seek = None;
                                MediaInfo { duration }
                            });
                            let _ = reply.send(result);
                        }
                        TrackCommand::Play(reply) => {
                            let result =
                                start_sink(&mut output, &mut sink, &mut pending, volume).map(
                                    |sink| {
                                        if let Some(target) = pending_seek.take() {
                                            let _ = sink.try_seek(Duration::from_secs_f64(target));
                                        }
                                        sink.play();
                                    },
                                );
                            if result.is_ok() {
                                is_paused.store(false, Ordering::SeqCst);
                            }
                            let _ = reply.send(result);
                        }
                        TrackCommand::Pause => {
                            if let Some(ref s) = sink {
                                s.pause();
                            }
                            is_paused.store(true, Ordering::SeqCst);
                        }
                        TrackCommand::Seek(target, reply) => {
                            let result = match sink {
                                Some(ref s) => s
                                    .try_seek(Duration::from_secs_f64(target))
                                    .map_err(|e| PlaybackError::Seek(e.to_string())),
                                None if pending.is_some() => {
                                    pending_seek = Some(target);
                                    Ok(())
                                }
                                None => Err(PlaybackError::Seek("track not loaded".into())),
                            };
                            let _ = reply.send(result);
                        }
                        TrackCommand::Position(reply) => {
                            let position = match (&sink, pending_seek) {
                                (Some(s), _) => s.get_pos().as_secs_f64(),
                                (None, Some(target)) => target,
                                (None, None) => 0.0,
                            };
                            let _ = reply.send(position);
                        }
                        TrackCommand::SetVolume(v) => {
                            volume = v.clamp(0.0, 1.0);
                            if let Some(ref s) = sink {
                                s.set_volume(volume);
                            }
                        }
                    }
                }
            })
            .map_err(|e| PlaybackError::Backend(e.to_string()))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> TrackCommand,
    ) -> Result<T, PlaybackError> {
        let tx = self.ensure_thread()?;
        let (reply_tx, reply_rx) = mpsc::channel();
        tx.send(build(reply_tx))
            .map_err(|e| PlaybackError::Backend(e.to_string()))?;
        reply_rx
            .recv()
            .map_err(|e| PlaybackError::Backend(e.to_string()))?
    }

    fn send(&self, cmd: TrackCommand) {
        if let Ok(tx) = self.ensure_thread() {
            let _ = tx.send(cmd);
        }
    }
}

fn open_track(path: &PathBuf) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path)
        .map_err(|e| PlaybackError::Load(format!("{}: {e}", path.display())))?;
    Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Load(e.to_string()))
}

/// Opens the device and sink on first use and queues the loaded source.
fn start_sink<'a>(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    sink: &'a mut Option<Sink>,
    pending: &mut Option<Decoder<BufReader<File>>>,
    volume: f32,
) -> Result<&'a Sink, PlaybackError> {
    if output.is_none() {
        // No device yet: report it the way a browser reports blocked autoplay.
        let stream = OutputStream::try_default().map_err(|_| PlaybackError::Blocked)?;
        *output = Some(stream);
    }

    if sink.is_none() {
        let Some((_, handle)) = output.as_ref() else {
            return Err(PlaybackError::Blocked);
        };
        let new_sink =
            Sink::try_new(handle).map_err(|e| PlaybackError::Backend(e.to_string()))?;
        new_sink.pause();
        new_sink.set_volume(volume);
        *sink = Some(new_sink);
    }

    let Some(current) = sink.as_ref() else {
        return Err(PlaybackError::Backend("sink unavailable".into()));
    };
    if let Some(source) = pending.take() {
        current.append(source);
    }
    Ok(current)
}

impl AudioElement for RodioTrack {
    fn load(&mut self) -> Result<MediaInfo, PlaybackError> {
        self.request(TrackCommand::Load)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.request(TrackCommand::Play)
    }

    fn pause(&mut self) {
        self.send(TrackCommand::Pause);
    }

    fn is_paused(&self) -> bool {
        self.is_paused.load(Ordering::SeqCst)
    }

    fn current_time(&self) -> f64 {
        let Ok(tx) = self.ensure_thread() else {
            return 0.0;
        };
        let (reply_tx, reply_rx) = mpsc::channel();
        if tx.send(TrackCommand::Position(reply_tx)).is_err() {
            return 0.0;
        }
        reply_rx.recv().unwrap_or(0.0)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.request(|reply| TrackCommand::Seek(seconds, reply))
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(TrackCommand::SetVolume(volume));
    }
}
