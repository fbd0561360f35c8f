//! The dispatch context: one Queue, one Buffer, one engine.
//!
//! Every operation goes through [`Dispatcher::dispatch`]. The chain tier
//! ([`Dispatcher::run`]) and the immediate tier ([`Dispatcher::eval`]) are
//! thin wrappers around it, and value operands ([`OperandRef::Value`]) are
//! registered inside it, so all three calling conventions share one code
//! path.

use smallvec::SmallVec;

use tenq_core::{
    constants, retrieve, ArgumentError, Entry, Handle, Origin, Queue, Result, ResultBuffer,
    Selector, Staged, Tensor, TenqError, Usage,
};
use tenq_exec::{CpuEngine, Device, EngineStatus, NativeEngine, Op, Operand};

use crate::call::Call;
use crate::config::DispatcherConfig;
use crate::diagnostics::Failure;
use crate::operand::{OperandRef, Output};

type Bindings = SmallVec<[Handle; 3]>;

/// Owns the named entry store, the result buffer and the engine.
///
/// # Examples
///
/// ```
/// use tenq_core::Tensor;
/// use tenq_dispatch::{Call, Dispatcher};
///
/// let mut tq = Dispatcher::new();
/// tq.put("x", Tensor::scalar(5.0)).unwrap();
/// tq.put("y", Tensor::scalar(3.0)).unwrap();
/// tq.add("x", "y", "z");
/// assert_eq!(tq.retrieve("z").unwrap().item(), Some(8.0));
///
/// // Immediate tier: scalar operands broadcast
/// let doubled = tq.eval(Call::mul(Tensor::vector(&[1.0, 2.0]), 2.0)).unwrap();
/// assert_eq!(doubled.data(), &[2.0, 4.0]);
/// ```
#[derive(Debug)]
pub struct Dispatcher<E: NativeEngine = CpuEngine> {
    queue: Queue,
    buffer: ResultBuffer,
    engine: E,
    config: DispatcherConfig,
    last_error: Option<TenqError>,
    failures: u64,
}

impl Dispatcher<CpuEngine> {
    /// Dispatcher over the reference CPU engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        let engine = CpuEngine::with_hints(config.hints.clone());
        Self::with_engine(engine, config)
    }
}

impl Default for Dispatcher<CpuEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: NativeEngine> Dispatcher<E> {
    /// Dispatcher over a custom engine.
    pub fn with_engine(mut engine: E, config: DispatcherConfig) -> Self {
        engine.select_device(config.hints.device);
        let mut queue = Queue::new();
        if config.preload_constants {
            if let Err(err) = constants::preload(&mut queue) {
                tracing::warn!(%err, "constant preload failed");
            }
        }
        tracing::debug!(engine = engine.name(), entries = queue.len(), "dispatcher created");
        Self {
            queue,
            buffer: ResultBuffer::new(),
            engine,
            config,
            last_error: None,
            failures: 0,
        }
    }

    /// Run one operation and register its output.
    ///
    /// Operands are resolved, checked for sufficient usage and handed to the
    /// engine. Only after the engine succeeds is every operand reference
    /// consumed; the output is then registered (usage 1, not broadcastable)
    /// and staged in the buffer.
    ///
    /// Auto operands are bound after the explicit ones, right to left, each
    /// taking the most recent entry not already bound in this call. With
    /// `a` registered before `b`, `sub(auto, auto)` computes `a - b`.
    ///
    /// # Errors
    ///
    /// - [`TenqError::InvalidArgument`]: wrong operand count, an invalid or
    ///   taken output name, an operand referenced more often than its
    ///   remaining usage, or a bad operation parameter
    /// - [`TenqError::NotFound`]: an operand does not resolve
    /// - [`TenqError::ShapeMismatch`] / [`TenqError::Engine`]: reported by
    ///   the engine
    ///
    /// On failure the queue holds exactly the entries it held before.
    pub fn dispatch(&mut self, call: Call, output: impl Into<Output>) -> Result<Handle> {
        let output = output.into();
        let Call { op, operands } = call;
        if operands.len() != op.arity() {
            return Err(ArgumentError::Arity {
                op: op.name(),
                expected: op.arity(),
                got: operands.len(),
            }
            .into());
        }
        self.check_output(&output)?;

        let mut selectors: SmallVec<[Option<Selector>; 3]> = SmallVec::new();
        let mut generated = Bindings::new();
        let mut preset: SmallVec<[Option<Handle>; 3]> = SmallVec::new();
        for operand in operands {
            match operand {
                OperandRef::Value {
                    tensor,
                    broadcastable,
                } => {
                    let handle =
                        self.queue
                            .register_generated(tensor, broadcastable, Origin::Generated);
                    generated.push(handle);
                    preset.push(Some(handle));
                    selectors.push(None);
                }
                other => {
                    preset.push(None);
                    selectors.push(other.selector());
                }
            }
        }

        let (handles, tensor) = match self.bind_and_execute(&op, &selectors, preset) {
            Ok(done) => done,
            Err(err) => {
                for handle in generated {
                    if let Err(leak) = self.queue.remove(&Selector::Slot(handle)) {
                        tracing::warn!(%handle, %leak, "value operand survived rollback");
                    }
                }
                tracing::debug!(op = op.name(), %err, "dispatch failed");
                return Err(err);
            }
        };

        for &handle in &handles {
            self.queue.consume_handle(handle)?;
        }

        let (handle, name) = match output {
            Output::Named(name) => {
                let handle = self.queue.register(&name, tensor.clone(), 1, false)?;
                (handle, Some(name))
            }
            Output::Auto => (
                self.queue.register_generated(tensor.clone(), false, Origin::Generated),
                None,
            ),
            Output::Scratch => (
                self.queue.register_generated(tensor.clone(), false, Origin::Scratch),
                None,
            ),
        };
        tracing::debug!(op = op.name(), output = %handle, shape = ?tensor.shape(), "dispatched");
        self.buffer.stage(handle, name, tensor);
        Ok(handle)
    }

    fn check_output(&self, output: &Output) -> Result<()> {
        if let Output::Named(name) = output {
            if name.is_empty() {
                return Err(ArgumentError::EmptyName.into());
            }
            Usage::for_name(name, 1)?;
            if self.queue.contains(name) {
                return Err(ArgumentError::DuplicateName(name.clone()).into());
            }
        }
        Ok(())
    }

    fn bind_and_execute(
        &mut self,
        op: &Op,
        selectors: &[Option<Selector>],
        preset: SmallVec<[Option<Handle>; 3]>,
    ) -> Result<(Bindings, Tensor)> {
        let handles = self.bind(selectors, preset)?;
        self.check_usage(op, &handles)?;
        let tensor = self.execute(op, &handles)?;
        Ok((handles, tensor))
    }

    fn bind(
        &self,
        selectors: &[Option<Selector>],
        mut bound: SmallVec<[Option<Handle>; 3]>,
    ) -> Result<Bindings> {
        for (slot, selector) in selectors.iter().enumerate() {
            match selector {
                Some(Selector::Auto) | None => {}
                Some(explicit) => bound[slot] = Some(self.queue.resolve(explicit, &[])?),
            }
        }
        for slot in (0..selectors.len()).rev() {
            if bound[slot].is_none() {
                let taken: Bindings = bound.iter().flatten().copied().collect();
                bound[slot] = Some(self.queue.resolve(&Selector::Auto, &taken)?);
            }
        }
        Ok(bound.into_iter().flatten().collect())
    }

    /// Every non-constant operand must survive until its last reference.
    fn check_usage(&self, op: &Op, handles: &[Handle]) -> Result<()> {
        for (i, &handle) in handles.iter().enumerate() {
            if handles[..i].contains(&handle) {
                continue;
            }
            let entry = self.lookup(handle)?;
            let needed = handles.iter().filter(|h| **h == handle).count() as u64;
            if let Usage::Remaining(remaining) = entry.usage() {
                if remaining < needed {
                    return Err(ArgumentError::UsageExhausted {
                        op: op.name(),
                        entry: entry.label(handle),
                        remaining,
                        needed,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, op: &Op, handles: &[Handle]) -> Result<Tensor> {
        let queue = &self.queue;
        let mut entries: SmallVec<[&Entry; 3]> = SmallVec::new();
        let mut labels: SmallVec<[String; 3]> = SmallVec::new();
        for &handle in handles {
            let entry = queue
                .get(handle)
                .ok_or(TenqError::NotFound(Selector::Slot(handle)))?;
            labels.push(entry.label(handle));
            entries.push(entry);
        }
        let operands: SmallVec<[Operand<'_>; 3]> = entries
            .iter()
            .zip(&labels)
            .map(|(entry, label)| Operand::new(entry.tensor(), entry.is_broadcastable(), label))
            .collect();
        tracing::trace!(op = op.name(), operands = ?labels, "executing");
        self.engine
            .execute(op, &operands)
            .map_err(|err| err.into_tenq(op.name()))
    }

    fn lookup(&self, handle: Handle) -> Result<&Entry> {
        self.queue
            .get(handle)
            .ok_or(TenqError::NotFound(Selector::Slot(handle)))
    }

    // Chain tier

    /// Dispatch without returning an error.
    ///
    /// A failure is logged as
    /// `tenq: <op> failed [operands: ... -> out]: <error>`, stored in
    /// [`Dispatcher::last_error`] and counted; the chain continues.
    pub fn run(&mut self, call: Call, output: impl Into<Output>) -> &mut Self {
        let output = output.into();
        let op = call.op().name();
        let operands = call.operands().iter().map(|o| self.describe(o)).collect();
        let target = output.to_string();
        if let Err(error) = self.dispatch(call, output) {
            let failure = Failure {
                op,
                operands,
                output: target,
                error,
            };
            failure.report(self.config.stderr_diagnostics);
            self.failures += 1;
            self.last_error = Some(failure.error);
        }
        self
    }

    fn describe(&self, operand: &OperandRef) -> String {
        match operand {
            OperandRef::Slot(handle) => self
                .queue
                .get(*handle)
                .map(|entry| entry.label(*handle))
                .unwrap_or_else(|| handle.to_string()),
            other => other.to_string(),
        }
    }

    /// `run(Call::add(a, b), out)`
    pub fn add(
        &mut self,
        a: impl Into<OperandRef>,
        b: impl Into<OperandRef>,
        out: impl Into<Output>,
    ) -> &mut Self {
        self.run(Call::add(a, b), out)
    }

    pub fn sub(
        &mut self,
        a: impl Into<OperandRef>,
        b: impl Into<OperandRef>,
        out: impl Into<Output>,
    ) -> &mut Self {
        self.run(Call::sub(a, b), out)
    }

    pub fn mul(
        &mut self,
        a: impl Into<OperandRef>,
        b: impl Into<OperandRef>,
        out: impl Into<Output>,
    ) -> &mut Self {
        self.run(Call::mul(a, b), out)
    }

    pub fn div(
        &mut self,
        a: impl Into<OperandRef>,
        b: impl Into<OperandRef>,
        out: impl Into<Output>,
    ) -> &mut Self {
        self.run(Call::div(a, b), out)
    }

    pub fn matmul(
        &mut self,
        a: impl Into<OperandRef>,
        b: impl Into<OperandRef>,
        out: impl Into<Output>,
    ) -> &mut Self {
        self.run(Call::matmul(a, b), out)
    }

    pub fn transpose(&mut self, x: impl Into<OperandRef>, out: impl Into<Output>) -> &mut Self {
        self.run(Call::transpose(x), out)
    }

    // Immediate tier

    /// Dispatch into a scratch entry and return the output directly.
    ///
    /// Operand usage is consumed as in the chain tier; the scratch entry
    /// and the buffer are cleared before returning.
    pub fn eval(&mut self, call: Call) -> Result<Tensor> {
        let handle = self.dispatch(call, Output::Scratch)?;
        retrieve(&mut self.queue, &mut self.buffer, &Selector::Slot(handle))
    }

    // Registration and retrieval

    /// Register a tensor; see [`Queue::register`].
    pub fn register(
        &mut self,
        name: &str,
        tensor: impl Into<Option<Tensor>>,
        usage: i64,
        broadcastable: bool,
    ) -> Result<Handle> {
        self.queue.register(name, tensor, usage, broadcastable)
    }

    /// Register a single-use, non-broadcastable tensor.
    pub fn put(&mut self, name: &str, tensor: Tensor) -> Result<Handle> {
        self.queue.register(name, tensor, 1, false)
    }

    /// Register a broadcastable constant; `name` must carry the `_` prefix.
    pub fn constant(&mut self, name: &str, tensor: Tensor) -> Result<Handle> {
        self.queue.register(name, tensor, -1, true)
    }

    /// Consume one use of an entry and return its tensor.
    ///
    /// Retrieving the staged output clears the buffer, and falls back to
    /// the staged copy if the entry itself is already gone.
    pub fn retrieve(&mut self, selector: impl Into<Selector>) -> Result<Tensor> {
        retrieve(&mut self.queue, &mut self.buffer, &selector.into())
    }

    /// Retrieve the output of the most recent operation.
    pub fn retrieve_last(&mut self) -> Result<Tensor> {
        self.retrieve(Selector::Auto)
    }

    /// Entry registered under `name`.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.queue.entry(name)
    }

    pub fn set_usage(&mut self, selector: impl Into<Selector>, count: i64) -> Result<()> {
        self.queue.set_usage(&selector.into(), count)
    }

    pub fn set_broadcastable(&mut self, selector: impl Into<Selector>, flag: bool) -> Result<()> {
        self.queue.set_broadcastable(&selector.into(), flag)
    }

    pub fn reshape(&mut self, selector: impl Into<Selector>, shape: &[usize]) -> Result<()> {
        self.queue.reshape(&selector.into(), shape)
    }

    /// Live entries in insertion order.
    pub fn entries(&self, include_constants: bool) -> Vec<(Handle, &Entry)> {
        self.queue.entries(include_constants)
    }

    /// Output staged by the most recent operation, if not yet retrieved.
    pub fn staged(&self) -> Option<&Staged> {
        self.buffer.peek()
    }

    /// Drop every non-constant entry and the staged output.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.buffer.clear();
    }

    /// Drop the staged output only.
    pub fn clear_buffer(&mut self) -> bool {
        self.buffer.clear()
    }

    // Error state

    /// Most recent chain-tier failure.
    pub fn last_error(&self) -> Option<&TenqError> {
        self.last_error.as_ref()
    }

    /// Take and reset the most recent chain-tier failure.
    pub fn take_error(&mut self) -> Option<TenqError> {
        self.last_error.take()
    }

    /// Number of chain-tier failures so far.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }

    // Device

    pub fn force_cpu(&mut self) {
        self.engine.select_device(Device::Cpu);
    }

    pub fn force_gpu(&mut self) {
        self.engine.select_device(Device::Gpu);
    }

    pub fn reset_device(&mut self) {
        self.engine.select_device(Device::Auto);
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}
