pub mod flush_worker;
pub mod frame_buffer;
pub mod frame_writer;
pub mod ingest;

pub use flush_worker::{FlushController, FlushSummary};
pub use frame_buffer::{BufferPush, BufferedFrame, FlushBatch, FrameBuffer};
pub use frame_writer::{frame_file_name, FrameWriter};
pub use ingest::{spawn_ingest_loop, FrameEvent, IngestHandle, IngestStats};
