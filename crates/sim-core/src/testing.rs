//! In-memory [`ComputeBackend`] that records every call.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use types::SimParams;

use crate::backend::{AllocationError, BufferSlot, ComputeBackend, KernelId, INTEGRATE_KERNEL, STEERING_KERNEL};

pub const STEERING: KernelId = KernelId(0);
pub const INTEGRATE: KernelId = KernelId(1);

#[derive(Debug, PartialEq, Eq)]
pub struct FakeBuffer {
    pub id: u32,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer { label: &'static str, size: u64 },
    ReleaseBuffer { id: u32 },
    WriteBuffer { id: u32, offset: u64, len: usize },
    BindBuffer { kernel: KernelId, slot: BufferSlot, id: u32 },
    SetParams(SimParams),
    Dispatch { kernel: KernelId, groups: [u32; 3] },
    Submit,
}

pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub thread_group_size: u32,
    pub max_buffer_size: u64,
    pub missing_kernels: Vec<&'static str>,
    contents: HashMap<u32, (&'static str, Vec<u8>)>,
    live: Rc<Cell<usize>>,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            thread_group_size: 256,
            max_buffer_size: 256 << 20,
            missing_kernels: Vec::new(),
            contents: HashMap::new(),
            live: Rc::new(Cell::new(0)),
            next_id: 1,
        }
    }

    pub fn with_thread_group_size(thread_group_size: u32) -> Self {
        Self {
            thread_group_size,
            ..Self::new()
        }
    }

    pub fn contents(&self, buffer: &FakeBuffer) -> &[u8] {
        match self.contents.get(&buffer.id) {
            Some((_, bytes)) => bytes,
            None => panic!("buffer {} is not live", buffer.id),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.get()
    }

    /// Shared live-buffer counter that outlives the backend.
    pub fn live_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.live)
    }

    pub fn live_labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<_> = self.contents.values().map(|(label, _)| *label).collect();
        labels.sort_unstable();
        labels
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl ComputeBackend for RecordingBackend {
    type Buffer = FakeBuffer;

    fn find_kernel(&self, name: &str) -> Option<KernelId> {
        if self.missing_kernels.iter().any(|k| *k == name) {
            return None;
        }
        match name {
            STEERING_KERNEL => Some(STEERING),
            INTEGRATE_KERNEL => Some(INTEGRATE),
            _ => None,
        }
    }

    fn thread_group_size(&self, _kernel: KernelId) -> u32 {
        self.thread_group_size
    }

    fn create_buffer(&mut self, label: &'static str, size: u64) -> Result<FakeBuffer, AllocationError> {
        self.calls.push(Call::CreateBuffer { label, size });
        if size == 0 {
            return Err(AllocationError::ZeroSize { label });
        }
        if size > self.max_buffer_size {
            return Err(AllocationError::ExceedsLimit {
                label,
                requested: size,
                limit: self.max_buffer_size,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.contents.insert(id, (label, vec![0; size as usize]));
        self.live.set(self.live.get() + 1);
        Ok(FakeBuffer { id, size })
    }

    fn release_buffer(&mut self, buffer: FakeBuffer) {
        self.calls.push(Call::ReleaseBuffer { id: buffer.id });
        assert!(
            self.contents.remove(&buffer.id).is_some(),
            "buffer {} released twice",
            buffer.id
        );
        self.live.set(self.live.get() - 1);
    }

    fn write_buffer(&mut self, buffer: &FakeBuffer, offset: u64, data: &[u8]) {
        self.calls.push(Call::WriteBuffer {
            id: buffer.id,
            offset,
            len: data.len(),
        });
        let Some((_, bytes)) = self.contents.get_mut(&buffer.id) else {
            panic!("write to released buffer {}", buffer.id);
        };
        let start = offset as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
    }

    fn bind_buffer(&mut self, kernel: KernelId, slot: BufferSlot, buffer: &FakeBuffer) {
        self.calls.push(Call::BindBuffer {
            kernel,
            slot,
            id: buffer.id,
        });
    }

    fn set_params(&mut self, params: &SimParams) {
        self.calls.push(Call::SetParams(*params));
    }

    fn dispatch(&mut self, kernel: KernelId, groups: [u32; 3]) {
        self.calls.push(Call::Dispatch { kernel, groups });
    }

    fn submit(&mut self) {
        self.calls.push(Call::Submit);
    }
}
