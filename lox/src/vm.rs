use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use crate::{
    compile, intern, Error, NativeFun, ObjFun, OpCode, RuntimeError, StrId, Value, MAX_FRAMES,
    MAX_STACK,
};

// Epoch for the `clock` native, captured when the first VM is constructed.
static VM_EPOCH: OnceLock<Instant> = OnceLock::new();

/// A single function invocation: the function being run, the instruction
/// pointer into its chunk, and the stack index where its locals begin.
/// Slot 0 of every frame is the function value itself.
#[derive(Debug)]
struct CallFrame {
    fun: Rc<ObjFun>,
    ip: usize,
    base: usize,
}

/// A bytecode virtual machine for the Lox programming language.
///
/// The machine is generic over the sink that receives the output of `print`
/// statements, defaulting to standard output. Diagnostics always go to
/// standard error. Global variables survive across calls to [`interpret`],
/// so a REPL can keep feeding lines to one machine.
///
/// [`interpret`]: VM::interpret
#[derive(Debug)]
pub struct VM<W = io::Stdout> {
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
    globals: HashMap<StrId, Value>,
    output: W,
}

impl Default for VM<io::Stdout> {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> VM<W> {
    /// Create a virtual machine that writes program output to the given sink.
    pub fn new(output: W) -> Self {
        VM_EPOCH.get_or_init(Instant::now);
        let mut vm = Self {
            frames: Vec::with_capacity(MAX_FRAMES),
            stack: Vec::with_capacity(MAX_STACK),
            globals: HashMap::default(),
            output,
        };
        vm.define_native("clock", clock_native);
        vm
    }

    /// Give back the output sink, consuming the virtual machine.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Compile and run the given source code. Compile and runtime diagnostics
    /// are written to stderr before the corresponding error is returned.
    pub fn interpret(&mut self, src: &str) -> Result<(), Error> {
        let fun = compile(src).ok_or(Error::Compile)?;
        if let Err(err) = self.run_script(Rc::new(fun)) {
            self.report(&err);
            return Err(Error::Runtime);
        }
        Ok(())
    }

    fn run_script(&mut self, fun: Rc<ObjFun>) -> Result<(), RuntimeError> {
        self.push(Value::Fun(Rc::clone(&fun)))?;
        self.call_function(fun, 0)?;
        self.run()
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let opcode = OpCode::try_from(self.read_byte())
                .expect("Compiler must only emit valid opcodes.");
            match opcode {
                OpCode::Constant => {
                    let val = self.read_constant();
                    self.push(val)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop()?;
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    let local = self.stack[base + slot].clone();
                    self.push(local)?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    let val = self.peek(0)?.clone();
                    self.stack[base + slot] = val;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string_constant();
                    let val = self
                        .globals
                        .get(&name)
                        .ok_or_else(|| RuntimeError::UndefinedVariable(intern::str(name)))?
                        .clone();
                    self.push(val)?;
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string_constant();
                    let val = self.pop()?;
                    self.globals.insert(name, val);
                }
                OpCode::SetGlobal => {
                    let name = self.read_string_constant();
                    if !self.globals.contains_key(&name) {
                        return Err(RuntimeError::UndefinedVariable(intern::str(name)));
                    }
                    // Assignment is an expression; its value stays on the
                    // stack.
                    let val = self.peek(0)?.clone();
                    self.globals.insert(name, val);
                }
                OpCode::Equal => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(Value::Bool(lhs == rhs))?;
                }
                OpCode::Greater => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(lhs.gt(&rhs)?)?;
                }
                OpCode::Less => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(lhs.lt(&rhs)?)?;
                }
                OpCode::Add => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push((&lhs + &rhs)?)?;
                }
                OpCode::Subtract => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push((&lhs - &rhs)?)?;
                }
                OpCode::Multiply => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push((&lhs * &rhs)?)?;
                }
                OpCode::Divide => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push((&lhs / &rhs)?)?;
                }
                OpCode::Not => {
                    let val = self.pop()?;
                    self.push(!&val)?;
                }
                OpCode::Negate => {
                    let val = self.pop()?;
                    self.push((-&val)?)?;
                }
                OpCode::Print => {
                    let val = self.pop()?;
                    writeln!(self.output, "{}", val).expect("Output sink must be writable.");
                }
                OpCode::Jump => {
                    let offset = self.read_short() as usize;
                    self.frame_mut().ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short() as usize;
                    if self.peek(0)?.is_falsey() {
                        self.frame_mut().ip += offset;
                    }
                }
                OpCode::JumpIfTrue => {
                    let offset = self.read_short() as usize;
                    if !self.peek(0)?.is_falsey() {
                        self.frame_mut().ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short() as usize;
                    self.frame_mut().ip -= offset;
                }
                OpCode::Call => {
                    let argc = self.read_byte() as usize;
                    let callee = self.peek(argc)?.clone();
                    self.call_value(callee, argc)?;
                }
                OpCode::Return => {
                    let result = self.pop()?;
                    let frame = self
                        .frames
                        .pop()
                        .expect("Return is only executed inside a call frame.");
                    if self.frames.is_empty() {
                        // Pop the script function; execution is done.
                        self.pop()?;
                        return Ok(());
                    }
                    self.stack.truncate(frame.base);
                    self.push(result)?;
                }
            }
        }
    }

    fn call_value(&mut self, callee: Value, argc: usize) -> Result<(), RuntimeError> {
        match callee {
            Value::Fun(fun) => self.call_function(fun, argc),
            Value::NativeFun(native) => {
                let args_start = self.stack.len() - argc;
                let result = (native.call)(&self.stack[args_start..]);
                // Drop the arguments and the callee below them.
                self.stack.truncate(args_start - 1);
                self.push(result)
            }
            _ => Err(RuntimeError::InvalidCall(
                "Can only call functions and classes".to_string(),
            )),
        }
    }

    fn call_function(&mut self, fun: Rc<ObjFun>, argc: usize) -> Result<(), RuntimeError> {
        if argc != fun.arity as usize {
            return Err(RuntimeError::InvalidCall(format!(
                "Expected {} arguments but got {}",
                fun.arity, argc
            )));
        }
        if self.frames.len() == MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }
        let base = self.stack.len() - argc - 1;
        self.frames.push(CallFrame { fun, ip: 0, base });
        Ok(())
    }

    fn define_native(&mut self, name: &str, call: fn(&[Value]) -> Value) {
        let name = intern::id(name);
        self.globals.insert(name, Value::NativeFun(NativeFun { name, call }));
    }

    /// Print the runtime error and a stack trace from the innermost frame
    /// outward, then reset the machine so the next `interpret` starts clean.
    fn report(&mut self, err: &RuntimeError) {
        eprintln!("{}", err);
        for frame in self.frames.iter().rev() {
            let line = frame.fun.chunk.line(frame.ip.saturating_sub(1));
            let name = intern::str(frame.fun.name);
            if name.is_empty() {
                eprintln!("[line {}] in script", line);
            } else {
                eprintln!("[line {}] in {}()", line, name);
            }
        }
        self.frames.clear();
        self.stack.clear();
    }

    fn frame(&self) -> &CallFrame {
        self.frames
            .last()
            .expect("Bytecode only runs inside a call frame.")
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames
            .last_mut()
            .expect("Bytecode only runs inside a call frame.")
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self
            .frames
            .last_mut()
            .expect("Bytecode only runs inside a call frame.");
        let byte = frame.fun.chunk.code(frame.ip);
        frame.ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        u16::from_be_bytes([self.read_byte(), self.read_byte()])
    }

    fn read_constant(&mut self) -> Value {
        let const_id = self.read_byte();
        self.frame().fun.chunk.constant(const_id).clone()
    }

    fn read_string_constant(&mut self) -> StrId {
        match self.read_constant() {
            Value::String(name) => name,
            _ => unreachable!("Variable names are interned string constants."),
        }
    }

    fn peek(&self, steps: usize) -> Result<&Value, RuntimeError> {
        self.stack
            .len()
            .checked_sub(1 + steps)
            .and_then(|idx| self.stack.get(idx))
            .ok_or(RuntimeError::StackUnderflow)
    }

    fn push(&mut self, val: Value) -> Result<(), RuntimeError> {
        if self.stack.len() == MAX_STACK {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(val);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }
}

fn clock_native(_args: &[Value]) -> Value {
    let epoch = VM_EPOCH.get_or_init(Instant::now);
    Value::Number(epoch.elapsed().as_secs() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> (Result<(), Error>, String) {
        let mut vm = VM::new(Vec::new());
        let res = vm.interpret(src);
        let out = String::from_utf8(vm.into_output()).expect("output is valid UTF-8");
        (res, out)
    }

    #[test]
    fn globals_survive_across_interpret_calls() {
        let mut vm = VM::new(Vec::new());
        vm.interpret("var answer = 42;").expect("valid program");
        vm.interpret("print answer;").expect("answer is defined");
        let out = String::from_utf8(vm.into_output()).expect("output is valid UTF-8");
        assert_eq!(out, "42\n");
    }

    #[test]
    fn the_stacks_are_clean_after_a_runtime_error() {
        let mut vm = VM::new(Vec::new());
        assert!(matches!(vm.interpret("print -\"oops\";"), Err(Error::Runtime)));
        assert!(vm.stack.is_empty());
        assert!(vm.frames.is_empty());
        vm.interpret("print 1;").expect("the machine recovered");
    }

    #[test]
    fn natives_are_defined_at_startup() {
        let (res, out) = run("print clock() >= 0;");
        assert!(res.is_ok());
        assert_eq!(out, "true\n");
    }

    #[test]
    fn printing_a_native_shows_a_placeholder() {
        let (res, out) = run("print clock;");
        assert!(res.is_ok());
        assert_eq!(out, "<native fn>\n");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let (res, _) = run("var x = 1; x();");
        assert!(matches!(res, Err(Error::Runtime)));
    }

    #[test]
    fn deep_recursion_overflows_the_frame_stack() {
        let (res, _) = run("fun f() { f(); } f();");
        assert!(matches!(res, Err(Error::Runtime)));
    }
}
