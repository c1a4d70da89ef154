//! WebAssembly bindings for the LC-3 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.
//! The console is a [`BufferConsole`]: JavaScript pushes keystrokes in and
//! drains program output after each run.

use wasm_bindgen::prelude::*;
use crate::{BufferConsole, Cpu, Image, Reg};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    cpu: Cpu<BufferConsole>,
    images: Vec<Image>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with empty memory.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(BufferConsole::new()),
            images: Vec::new(),
        }
    }

    /// Load an object image (big-endian words, origin first).
    /// Returns the number of words stored.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        let image = Image::from_bytes(bytes)
            .map_err(|e| JsError::new(&e.to_string()))?;

        let stored = self.cpu.load_image(&image);
        self.images.push(image);
        Ok(stored)
    }

    /// Queue keystrokes for GETC, IN and the keyboard status register.
    #[wasm_bindgen]
    pub fn push_input(&mut self, text: &str) {
        self.cpu.console_mut().push_input(text);
    }

    /// Drain everything the program has written so far.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> String {
        let bytes = self.cpu.console_mut().take_output();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Step one instruction. Returns the decoded instruction as debug text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step()
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(format!("{:?}", instr))
    }

    /// Run until halt, error or `max_cycles`. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    /// Reset the machine and reload every image loaded so far.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
        for image in &self.images {
            self.cpu.load_image(image);
        }
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// Get general purpose register `index` (0-7).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> Result<u16, JsError> {
        let reg = Reg::from_index(index)
            .ok_or_else(|| JsError::new(&format!("no register R{}", index)))?;
        Ok(self.cpu.regs.get(reg))
    }

    /// Address of the instruction that faulted, if the machine stopped on an error.
    #[wasm_bindgen]
    pub fn fault(&self) -> Option<u16> {
        self.cpu.fault()
    }

    /// Get a memory word without triggering device side effects.
    #[wasm_bindgen]
    pub fn memory_at(&self, address: u16) -> u16 {
        self.cpu.mem.peek(address)
    }

    /// Get registers and state as a JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&serde_json::json!({
            "registers": &self.cpu.regs,
            "state": self.cpu.state,
            "cycles": self.cpu.cycles,
            "fault": self.cpu.fault(),
        }))
        .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}
