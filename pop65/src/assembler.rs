//! Main assembler implementation: the two-pass driver

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::addressing::Operand;
use crate::cond::CondStack;
use crate::debug::{CommentBuffer, DebugTemplate};
use crate::encoder;
use crate::error::{AsmError, ErrorKind, Location, Result};
use crate::eval::{ExpressionEvaluator, ForwardRefs};
#[cfg(feature = "listing")]
use crate::listing::Listing;
use crate::parser::expression::{Expr, ExpressionParser};
use crate::parser::lexer::{conditional_keyword, parse_line, Conditional, Operation, Token};
use crate::source::{normalize, FileResolver, FsResolver, IncludeFrame, Loaded, SourceFile};
use crate::symbol::{Pass, SymbolOrigin, SymbolTable};

/// Default limit for nested `.inc` files.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmConfig {
    /// Initial program counter. Without one, code before the first `.org`
    /// fails with `NoOrigin`.
    pub origin: Option<u16>,
    pub max_include_depth: usize,
    /// Extra search directories for the filesystem resolver.
    pub include_dirs: Vec<PathBuf>,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            origin: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            include_dirs: Vec::new(),
        }
    }
}

/// Everything produced by a successful run.
#[derive(Debug, Default)]
pub struct Output {
    /// Object code, in program order, while output was on.
    pub bytes: Vec<u8>,
    /// One formatted record per label defined under a `.dbg` template.
    pub debug: Vec<String>,
    /// `=`/`.equ` definitions in definition order.
    pub constants: Vec<(String, u16)>,
    pub symbols: SymbolTable,
    /// Failed `.assert`s. Assembly continues past them but the run counts
    /// as failed.
    pub diagnostics: Vec<AsmError>,
    #[cfg(feature = "listing")]
    pub listing: Listing,
}

impl Output {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.symbols.get(name).map(|sym| sym.value)
    }

    /// Symbol file contents: one `name = $XXXX` line per assignment.
    pub fn symbol_file(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.constants {
            let _ = writeln!(out, "{} = ${:04X}", name, value);
        }
        out
    }

    /// Debug file contents: one line per debug record.
    pub fn debug_file(&self) -> String {
        let mut out = String::new();
        for record in &self.debug {
            out.push_str(record);
            out.push('\n');
        }
        out
    }
}

/// Two-pass 6502 assembler.
///
/// All run state lives here and every entry point takes `&mut self`. One
/// instance must not be shared between threads without external
/// synchronization; it is reset at the start of each run.
pub struct Assembler {
    config: AsmConfig,
    resolver: Box<dyn FileResolver>,

    pass: Pass,
    pc: Option<u16>,
    symbols: SymbolTable,
    cond: CondStack,
    stack: Vec<IncludeFrame>,
    loaded: Vec<Loaded>,
    load_cursor: usize,
    output_on: bool,
    template: Option<DebugTemplate>,
    comments: CommentBuffer,
    out: Output,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(AsmConfig::default())
    }
}

impl Assembler {
    /// An assembler reading files from disk.
    pub fn new(config: AsmConfig) -> Self {
        let resolver = FsResolver::new(config.include_dirs.clone());
        Self::with_resolver(config, resolver)
    }

    /// An assembler reading files through `resolver`. `include_dirs` in the
    /// config is ignored.
    pub fn with_resolver(config: AsmConfig, resolver: impl FileResolver + 'static) -> Self {
        Self {
            config,
            resolver: Box::new(resolver),
            pass: Pass::One,
            pc: None,
            symbols: SymbolTable::new(),
            cond: CondStack::new(),
            stack: Vec::new(),
            loaded: Vec::new(),
            load_cursor: 0,
            output_on: true,
            template: None,
            comments: CommentBuffer::default(),
            out: Output::default(),
        }
    }

    pub fn config(&self) -> &AsmConfig {
        &self.config
    }

    // ===== Public API =====

    /// Assemble source text. `name` is used in diagnostics and as the base
    /// for relative includes.
    pub fn assemble_str(&mut self, name: &str, src: &str) -> Result<Output> {
        let root = Rc::new(SourceFile::new(name, PathBuf::from(normalize(name)), src));
        self.run(root)
    }

    pub fn assemble_file(&mut self, path: impl AsRef<Path>) -> Result<Output> {
        let name = path.as_ref().display().to_string();
        let (id, bytes) = self.resolver.load(&name, None)?;
        let root = Rc::new(SourceFile::from_bytes(normalize(&name), id, &bytes));
        self.run(root)
    }

    // ===== Passes =====

    fn run(&mut self, root: Rc<SourceFile>) -> Result<Output> {
        self.symbols.clear();
        self.loaded.clear();

        for pass in [Pass::One, Pass::Two] {
            self.start_pass(pass);
            debug!(?pass, file = %root.name, "starting pass");
            self.walk(Rc::clone(&root))?;
        }

        if let Some(sym) = self.symbols.first_missing_in_pass2() {
            return Err(AsmError::new(
                ErrorKind::Phase,
                format!("'{}' was defined in pass 1 but not in pass 2", sym.name),
            ));
        }

        let mut out = std::mem::take(&mut self.out);
        out.symbols = std::mem::take(&mut self.symbols);
        debug!(
            bytes = out.bytes.len(),
            symbols = out.symbols.len(),
            failed_asserts = out.diagnostics.len(),
            "assembly complete"
        );
        Ok(out)
    }

    fn start_pass(&mut self, pass: Pass) {
        self.pass = pass;
        self.pc = self.config.origin;
        self.cond.start_pass(pass);
        self.stack.clear();
        self.load_cursor = 0;
        self.output_on = true;
        self.template = None;
        self.comments.clear();
        self.out = Output::default();
    }

    /// Process lines until the include stack is empty.
    fn walk(&mut self, root: Rc<SourceFile>) -> Result<()> {
        self.stack.push(IncludeFrame::new(root, self.cond.depth()));

        while let Some(frame) = self.stack.last_mut() {
            let index = frame.next_line;
            frame.next_line += 1;
            let file = Rc::clone(&frame.file);

            let Some(text) = file.line(index) else {
                if let Some(done) = self.stack.pop() {
                    trace!(file = %file.name, "end of file");
                    self.comments.clear();
                    self.cond.close_file(done.cond_base).map_err(|e| {
                        e.at(&Location {
                            file: file.name.clone(),
                            line: file.len().max(1),
                        })
                    })?;
                }
                continue;
            };

            #[cfg(feature = "listing")]
            let mark = (self.pc, self.out.bytes.len(), self.cond.is_live());

            self.assemble_line(text, &file, index).map_err(|e| {
                e.at(&Location {
                    file: file.name.clone(),
                    line: index + 1,
                })
            })?;

            #[cfg(feature = "listing")]
            if self.pass == Pass::Two && mark.2 {
                let emitted = self.out.bytes[mark.1..].to_vec();
                self.out.listing.push(mark.0, emitted, text);
            }
        }
        Ok(())
    }

    // ===== Lines =====

    fn assemble_line(&mut self, text: &str, file: &Rc<SourceFile>, index: usize) -> Result<()> {
        if !self.cond.is_live() {
            return self.skip_line(text);
        }

        let line = parse_line(text)?;
        if line.is_blank() {
            self.comments.clear();
            return Ok(());
        }
        if line.is_comment_only() {
            self.comments.push(line.comment.as_deref().unwrap_or_default());
            return Ok(());
        }
        let comment = self.comments.take_with(line.comment.as_deref());

        let label = line.label;
        let operands = line.operands;
        match line.operation {
            None => self.define_label_here(label.as_deref(), &comment),
            Some(Operation::Assign) => self.assign(label.as_deref(), &operands),
            Some(Operation::Instruction(mnemonic)) => {
                self.define_label_here(label.as_deref(), &comment)?;
                self.instruction(&mnemonic, &operands)
            }
            Some(Operation::Directive(name)) => {
                self.directive(&name, label.as_deref(), &operands, &comment, file, index)
            }
        }
    }

    /// A line inside a false conditional: only nesting is tracked.
    fn skip_line(&mut self, text: &str) -> Result<()> {
        self.comments.clear();
        let base = self.cond_base();
        match conditional_keyword(text) {
            Some(Conditional::If) => self.cond.push_if(self.pass, || Ok(false)),
            Some(Conditional::Else) => self.cond.flip_else(base),
            Some(Conditional::Endif) => self.cond.pop_endif(base),
            None => Ok(()),
        }
    }

    fn directive(
        &mut self,
        name: &str,
        label: Option<&str>,
        operands: &[Token],
        comment: &str,
        file: &Rc<SourceFile>,
        index: usize,
    ) -> Result<()> {
        match name {
            ".if" | ".else" | ".endif" => {
                if let Some(label) = label {
                    return Err(AsmError::syntax(format!(
                        "label '{}' not allowed on {}",
                        label, name
                    )));
                }
                self.conditional(name, operands)
            }
            ".org" => {
                let origin = self.eval(&ExpressionParser::parse(operands)?, ForwardRefs::Forbid)?;
                self.pc = Some(origin);
                trace!(origin = format_args!("${:04X}", origin), ".org");
                match label {
                    Some(label) => self.define_label(label, origin, comment),
                    None => Ok(()),
                }
            }
            ".equ" => self.assign(label, operands),
            _ => {
                self.define_label_here(label, comment)?;
                match name {
                    ".byte" => self.data_bytes(operands),
                    ".word" => self.data_words(operands),
                    ".ds" => self.reserve(operands),
                    ".bin" | ".incbin" => self.binary(operands, file),
                    ".inc" | ".lib" | ".fil" => self.include(operands, file),
                    ".assert" => self.assert(operands, file, index),
                    ".on" | ".off" => {
                        no_operands(name, operands)?;
                        self.output_on = name == ".on";
                        Ok(())
                    }
                    ".dbg" => {
                        self.template = match operands {
                            [] => None,
                            [Token::Str(template)] => Some(DebugTemplate::parse(template)?),
                            _ => return Err(AsmError::syntax(".dbg takes one quoted template")),
                        };
                        Ok(())
                    }
                    _ => Err(AsmError::syntax(format!("unknown directive '{}'", name))),
                }
            }
        }
    }

    fn conditional(&mut self, name: &str, operands: &[Token]) -> Result<()> {
        let base = self.cond_base();
        match name {
            ".if" => {
                let expr = ExpressionParser::parse(operands)?;
                let pass = self.pass;
                let symbols = &self.symbols;
                let pc = self.pc;
                self.cond.push_if(pass, || {
                    let value = ExpressionEvaluator::new(symbols, pc, pass)
                        .with_forward_refs(ForwardRefs::Forbid)
                        .evaluate(&expr)?;
                    Ok(value != 0)
                })
            }
            ".else" => {
                no_operands(name, operands)?;
                self.cond.flip_else(base)
            }
            _ => {
                no_operands(name, operands)?;
                self.cond.pop_endif(base)
            }
        }
    }

    fn cond_base(&self) -> usize {
        self.stack.last().map_or(0, |frame| frame.cond_base)
    }

    // ===== Symbols =====

    fn assign(&mut self, label: Option<&str>, operands: &[Token]) -> Result<()> {
        let name = label.ok_or_else(|| AsmError::syntax("assignment without a name"))?;
        let value = self.eval(&ExpressionParser::parse(operands)?, ForwardRefs::Forbid)?;
        self.symbols
            .define(name, value, SymbolOrigin::Assignment, self.pass)?;
        if self.pass == Pass::Two {
            self.out.constants.push((name.to_string(), value));
        }
        Ok(())
    }

    fn define_label_here(&mut self, label: Option<&str>, comment: &str) -> Result<()> {
        match label {
            Some(name) => {
                let pc = self.require_pc()?;
                self.define_label(name, pc, comment)
            }
            None => Ok(()),
        }
    }

    fn define_label(&mut self, name: &str, value: u16, comment: &str) -> Result<()> {
        self.symbols.define(name, value, SymbolOrigin::Label, self.pass)?;
        if self.pass == Pass::Two {
            if let Some(template) = &self.template {
                self.out.debug.push(template.format(name, value, comment));
            }
        }
        Ok(())
    }

    // ===== Code and data =====

    fn instruction(&mut self, mnemonic: &str, operands: &[Token]) -> Result<()> {
        let operand = Operand::classify(operands)?;
        let encoding = encoder::select(mnemonic, &operand, |e| {
            self.evaluator(ForwardRefs::Forbid).try_evaluate(e)
        })?;

        match self.pass {
            Pass::One => self.advance(encoding.size() as usize),
            Pass::Two => {
                let value = operand
                    .expr()
                    .map(|e| self.eval(e, ForwardRefs::Allow))
                    .transpose()?;
                let pc = self.require_pc()?;
                let bytes = encoder::encode(encoding, value, pc)?;
                self.emit(&bytes)
            }
        }
    }

    fn data_bytes(&mut self, operands: &[Token]) -> Result<()> {
        let items = split_operands(operands);
        if items.is_empty() {
            return Err(AsmError::syntax(".byte needs at least one value"));
        }
        let mut bytes = Vec::new();
        let mut size = 0usize;
        for item in items {
            match item {
                [Token::Str(s)] if s.chars().count() != 1 => {
                    size += s.chars().count();
                    bytes.extend(s.chars().map(|c| c as u32 as u8));
                }
                _ => {
                    let expr = ExpressionParser::parse(item)?;
                    size += 1;
                    if self.pass == Pass::Two {
                        bytes.push(self.eval(&expr, ForwardRefs::Allow)? as u8);
                    }
                }
            }
        }
        self.produce(size, &bytes)
    }

    fn data_words(&mut self, operands: &[Token]) -> Result<()> {
        let items = split_operands(operands);
        if items.is_empty() {
            return Err(AsmError::syntax(".word needs at least one value"));
        }
        let mut bytes = Vec::with_capacity(items.len() * 2);
        for item in &items {
            let expr = ExpressionParser::parse(item)?;
            if self.pass == Pass::Two {
                let value = self.eval(&expr, ForwardRefs::Allow)?;
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        self.produce(items.len() * 2, &bytes)
    }

    fn reserve(&mut self, operands: &[Token]) -> Result<()> {
        let items = split_operands(operands);
        let (count, fill) = match items.as_slice() {
            [count] => (*count, None),
            [count, fill] => (*count, Some(*fill)),
            _ => return Err(AsmError::syntax(".ds takes a count and an optional fill value")),
        };
        let count = self.eval(&ExpressionParser::parse(count)?, ForwardRefs::Forbid)? as usize;
        let fill = fill.map(ExpressionParser::parse).transpose()?;
        match self.pass {
            Pass::One => self.advance(count),
            Pass::Two => {
                let fill = match fill {
                    Some(expr) => self.eval(&expr, ForwardRefs::Allow)? as u8,
                    None => 0,
                };
                self.emit(&vec![fill; count])
            }
        }
    }

    fn binary(&mut self, operands: &[Token], file: &Rc<SourceFile>) -> Result<()> {
        let name = string_operand(".bin", operands)?;
        let data = match self.pass {
            Pass::One => {
                let (_, bytes) = self.resolver.load(name, Some(&file.path))?;
                let data: Rc<[u8]> = bytes.into();
                self.loaded.push(Loaded::Binary(Rc::clone(&data)));
                data
            }
            Pass::Two => match self.replay()? {
                Loaded::Binary(data) => data,
                Loaded::Source(_) => return Err(replay_mismatch(name)),
            },
        };
        trace!(name, len = data.len(), ".bin");
        self.produce(data.len(), &data)
    }

    fn include(&mut self, operands: &[Token], file: &Rc<SourceFile>) -> Result<()> {
        let name = string_operand(".inc", operands)?;
        if self.stack.len() > self.config.max_include_depth {
            return Err(AsmError::new(
                ErrorKind::IncludeDepth,
                format!(
                    "'{}' nests includes deeper than {}",
                    name, self.config.max_include_depth
                ),
            ));
        }
        let included = match self.pass {
            Pass::One => {
                let (id, bytes) = self.resolver.load(name, Some(&file.path))?;
                let included = Rc::new(SourceFile::from_bytes(normalize(name), id, &bytes));
                self.loaded.push(Loaded::Source(Rc::clone(&included)));
                included
            }
            Pass::Two => match self.replay()? {
                Loaded::Source(included) => included,
                Loaded::Binary(_) => return Err(replay_mismatch(name)),
            },
        };
        if self.stack.iter().any(|frame| frame.file.path == included.path) {
            return Err(AsmError::new(
                ErrorKind::IncludeDepth,
                format!("'{}' is already being included", name),
            ));
        }
        trace!(file = %included.name, depth = self.stack.len(), ".inc");
        self.stack
            .push(IncludeFrame::new(included, self.cond.depth()));
        Ok(())
    }

    fn replay(&mut self) -> Result<Loaded> {
        let entry = self
            .loaded
            .get(self.load_cursor)
            .cloned()
            .ok_or_else(|| AsmError::new(ErrorKind::Phase, "file was not read in pass 1"))?;
        self.load_cursor += 1;
        Ok(entry)
    }

    fn assert(&mut self, operands: &[Token], file: &Rc<SourceFile>, index: usize) -> Result<()> {
        let items = split_operands(operands);
        let (expr, message) = match items.as_slice() {
            [expr] => (ExpressionParser::parse(expr)?, None),
            [expr, [Token::Str(message)]] => (ExpressionParser::parse(expr)?, Some(message.clone())),
            _ => return Err(AsmError::syntax(".assert takes an expression and an optional message")),
        };
        if self.pass == Pass::One {
            return Ok(());
        }
        if self.eval(&expr, ForwardRefs::Allow)? == 0 {
            let failure = AsmError::new(
                ErrorKind::AssertionFailed,
                message.unwrap_or_else(|| expr.to_string()),
            )
            .at(&Location {
                file: file.name.clone(),
                line: index + 1,
            });
            warn!("{}", failure);
            self.out.diagnostics.push(failure);
        }
        Ok(())
    }

    // ===== Program counter =====

    fn require_pc(&self) -> Result<u16> {
        self.pc
            .ok_or_else(|| AsmError::new(ErrorKind::NoOrigin, "no .org before code or labels"))
    }

    fn advance(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        let pc = self.require_pc()?;
        self.pc = Some(pc.wrapping_add(size as u16));
        Ok(())
    }

    /// Write bytes at the current PC (pass 2 only) and advance past them.
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.require_pc()?;
        if self.output_on {
            self.out.bytes.extend_from_slice(bytes);
        }
        self.advance(bytes.len())
    }

    /// Advance in pass 1, emit in pass 2.
    fn produce(&mut self, size: usize, bytes: &[u8]) -> Result<()> {
        match self.pass {
            Pass::One => self.advance(size),
            Pass::Two => self.emit(bytes),
        }
    }

    // ===== Evaluation =====

    fn evaluator(&self, forward: ForwardRefs) -> ExpressionEvaluator<'_> {
        ExpressionEvaluator::new(&self.symbols, self.pc, self.pass).with_forward_refs(forward)
    }

    fn eval(&self, expr: &Expr, forward: ForwardRefs) -> Result<u16> {
        self.evaluator(forward).evaluate(expr)
    }
}

fn split_operands(operands: &[Token]) -> Vec<&[Token]> {
    if operands.is_empty() {
        return Vec::new();
    }
    operands.split(|tok| *tok == Token::Comma).collect()
}

fn no_operands(name: &str, operands: &[Token]) -> Result<()> {
    match operands.first() {
        None => Ok(()),
        Some(tok) => Err(AsmError::syntax(format!("unexpected '{}' after {}", tok, name))),
    }
}

fn string_operand<'a>(directive: &str, operands: &'a [Token]) -> Result<&'a str> {
    match operands {
        [Token::Str(name)] => Ok(name),
        _ => Err(AsmError::syntax(format!("{} takes one quoted file name", directive))),
    }
}

fn replay_mismatch(name: &str) -> AsmError {
    AsmError::new(
        ErrorKind::Phase,
        format!("'{}' was read differently in pass 1", name),
    )
}
