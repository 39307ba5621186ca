mod control_receiver;
mod playback_timing;
mod server;
mod session;
mod session_tests;
mod timing;

mod artwork_handler;
mod metadata_handler;
mod rtsp_handler_extra;
