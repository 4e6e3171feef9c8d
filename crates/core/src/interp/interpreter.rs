//! Content stream interpreter.
//!
//! [`PageInterpreter`] feeds the tokens of a page, form or pattern cell
//! through a graphics state machine and reports what gets drawn to a
//! [`MarkupHandler`]. Operands pile up until an operator arrives; the
//! operator's arity is checked and it is dispatched to one of the `do_*`
//! methods in [`ops`](super::ops).

use super::device::MarkupHandler;
use super::factory::Factories;
use super::resources::{ResourceKey, ResourceManager};
use crate::content::{ContentLexer, Token};
use crate::document::{PDFDocument, PDFPage};
use crate::error::{PdfError, Result};
use crate::model::{
    GraphicsStack, GraphicsState, LoadedFont, PDFDict, PDFObject, Path, WindingRule,
};
use crate::utils::{MATRIX_IDENTITY, Matrix, Rect, apply_matrix_rect, normalize_rect};
use bytes::Bytes;
use itertools::Itertools;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

/// Cooperative cancellation flag shared between a caller and interpreters.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Interpreter configuration.
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// How deep forms and tiling patterns may nest
    pub max_nesting_depth: usize,
    pub cancel: Option<CancelToken>,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            cancel: None,
        }
    }
}

impl InterpreterOptions {
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Error handling mode. Inside `BX`/`EX` sections operator errors are
/// logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompatMode {
    #[default]
    Strict,
    Lenient,
}

/// Operand count an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    Exact(usize),
    Variable,
}

/// Operand counts of every operator the interpreter knows.
pub(crate) fn arity(op: &str) -> Option<Arity> {
    use Arity::{Exact, Variable};
    Some(match op {
        "q" | "Q" | "h" | "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" | "W"
        | "W*" | "BT" | "ET" | "T*" | "BI" | "EMC" | "BX" | "EX" => Exact(0),
        "w" | "J" | "j" | "M" | "ri" | "i" | "gs" | "g" | "G" | "cs" | "CS" | "sh" | "Do"
        | "Tc" | "Tw" | "Tz" | "TL" | "Tr" | "Ts" | "Tj" | "TJ" | "'" | "EI" | "BMC" | "MP" => {
            Exact(1)
        }
        "d" | "m" | "l" | "Tf" | "Td" | "TD" | "BDC" | "DP" | "d0" => Exact(2),
        "rg" | "RG" | "\"" => Exact(3),
        "v" | "y" | "re" | "k" | "K" => Exact(4),
        "cm" | "c" | "Tm" | "d1" => Exact(6),
        "sc" | "scn" | "SC" | "SCN" | "ID" => Variable,
        _ => return None,
    })
}

/// Clip requested by `W`/`W*`, applied by the next painting operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingClip(pub WindingRule);

/// Text and text line matrices of an open `BT` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TextObject {
    pub tm: Matrix,
    pub tlm: Matrix,
}

impl TextObject {
    pub fn new() -> Self {
        Self {
            tm: MATRIX_IDENTITY,
            tlm: MATRIX_IDENTITY,
        }
    }
}

pub(crate) type Operands = SmallVec<[PDFObject; 8]>;

/// Interprets content streams against one handler.
///
/// An interpreter is cheap to build; make one per page. The document,
/// factories and resource caches are borrowed and may be shared between
/// interpreters running on different threads.
pub struct PageInterpreter<'a, H: MarkupHandler + ?Sized> {
    pub(crate) doc: &'a PDFDocument,
    pub(crate) factories: &'a Factories,
    pub(crate) resources: &'a ResourceManager,
    pub(crate) handler: &'a mut H,
    pub(crate) options: InterpreterOptions,
    pub(crate) gstack: GraphicsStack,
    /// Path under construction; not part of the graphics state
    pub(crate) path: Path,
    pub(crate) pending_clip: Option<PendingClip>,
    pub(crate) text: Option<TextObject>,
    /// Resource dictionaries of the page and the forms being run
    pub(crate) resource_stack: Vec<PDFDict>,
    operands: Operands,
    /// Operand indices of open `<<`
    dict_marks: SmallVec<[usize; 4]>,
    pub(crate) compat: CompatMode,
    pub(crate) compat_depth: usize,
    /// `BX` depth the running stream started with
    pub(crate) compat_floor: usize,
    /// Graphics stack depth the running stream started with
    pub(crate) stack_floor: usize,
    /// Form and pattern nesting
    pub(crate) depth: usize,
    /// Dictionary collected by `ID`, consumed by `EI`
    pub(crate) inline_dict: Option<PDFDict>,
    /// CTM that pattern matrices are relative to
    pub(crate) base_ctm: Matrix,
    /// Device-space bounds of the page or cell being drawn
    pub(crate) page_bounds: Rect,
}

impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    pub fn new(
        doc: &'a PDFDocument,
        factories: &'a Factories,
        resources: &'a ResourceManager,
        handler: &'a mut H,
    ) -> Self {
        let path = factories.path.create_empty_path();
        Self {
            doc,
            factories,
            resources,
            handler,
            options: InterpreterOptions::default(),
            gstack: GraphicsStack::new(GraphicsState::default()),
            path,
            pending_clip: None,
            text: None,
            resource_stack: Vec::new(),
            operands: Operands::new(),
            dict_marks: SmallVec::new(),
            compat: CompatMode::Strict,
            compat_depth: 0,
            compat_floor: 0,
            stack_floor: 1,
            depth: 0,
            inline_dict: None,
            base_ctm: MATRIX_IDENTITY,
            page_bounds: (0.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    /// Current graphics state.
    pub fn state(&self) -> &GraphicsState {
        self.gstack.current()
    }

    pub fn compat_mode(&self) -> CompatMode {
        self.compat
    }

    /// Resets the graphics state to its initial values under `ctm` and asks
    /// the factories for the initial paints.
    pub(crate) fn init_state(&mut self, ctm: Matrix) {
        let mut state = GraphicsState::new(ctm);
        let color = &self.factories.color;
        state.fill_paint = Some(color.create_color(&state.fill_space, state.fill_color.components()));
        state.stroke_paint =
            Some(color.create_color(&state.stroke_space, state.stroke_color.components()));
        state.fill_composite = Some(color.create_composite(
            &state.fill_space,
            &state.blend_mode,
            state.alpha_is_shape,
            state.fill_alpha,
        ));
        state.stroke_composite = Some(color.create_composite(
            &state.stroke_space,
            &state.blend_mode,
            state.alpha_is_shape,
            state.stroke_alpha,
        ));
        state.stroke = Some(self.factories.path.create_stroke(&state));
        self.gstack = GraphicsStack::new(state);
        self.path = self.factories.path.create_empty_path();
        self.pending_clip = None;
        self.text = None;
        self.operands.clear();
        self.dict_marks.clear();
        self.compat = CompatMode::Strict;
        self.compat_depth = 0;
        self.compat_floor = 0;
        self.stack_floor = 1;
        self.inline_dict = None;
        self.base_ctm = ctm;
    }

    /// Interprets one page: `begin_page`, the content, then `end_page`.
    ///
    /// `end_page` is called on failure too, so the handler keeps whatever
    /// was drawn before the error.
    pub fn process_page(&mut self, page: &PDFPage) -> Result<()> {
        let (width, height) = page.size();
        self.page_bounds = (0.0, 0.0, width, height);
        self.handler.begin_page(width, height);
        let result = page
            .content_bytes(self.doc)
            .and_then(|content| {
                self.depth = 0;
                self.render_content(content, page.resources.clone(), page.device_ctm(), None)
            });
        self.handler.end_page();
        if let Err(err) = &result {
            debug!(page = page.objid, error = %err, "page interpretation failed");
        }
        result
    }

    /// Interprets a standalone content stream, such as a pattern cell, with
    /// `ctm` as the initial transform. A `bbox` (in user space) becomes the
    /// initial clip.
    pub fn render_content(
        &mut self,
        content: impl Into<Bytes>,
        resources: PDFDict,
        ctm: Matrix,
        bbox: Option<Rect>,
    ) -> Result<()> {
        self.init_state(ctm);
        self.resource_stack = vec![resources];
        if let Some(bbox) = bbox {
            self.page_bounds = apply_matrix_rect(ctm, bbox);
            let clip = self
                .factories
                .path
                .intersect_clip(None, Path::from_rect(bbox).transform(ctm));
            self.set_clip(Some(clip));
        }
        self.interpret(content.into())
    }

    /// Runs one content stream in the current state. Saved states, text
    /// objects and compatibility sections must be closed by the stream that
    /// opened them.
    pub(crate) fn interpret(&mut self, content: Bytes) -> Result<()> {
        let saved_text = self.text.take();
        let saved_stack_floor = std::mem::replace(&mut self.stack_floor, self.gstack.depth());
        let saved_compat_floor = std::mem::replace(&mut self.compat_floor, self.compat_depth);

        let result = self.run_tokens(content);

        self.compat_depth = self.compat_floor;
        self.compat = if self.compat_depth > 0 {
            CompatMode::Lenient
        } else {
            CompatMode::Strict
        };
        self.compat_floor = saved_compat_floor;
        self.stack_floor = saved_stack_floor;
        self.text = saved_text;
        self.operands.clear();
        self.dict_marks.clear();
        result
    }

    fn run_tokens(&mut self, content: Bytes) -> Result<()> {
        let mut lexer = ContentLexer::new(content);
        while let Some(token) = lexer.next_token() {
            self.check_cancelled()?;
            if let Err(err) = token.and_then(|token| self.push_token(token)) {
                self.recover(err)?;
            }
        }
        let open_states = self.gstack.depth() - self.stack_floor;
        if open_states > 0 {
            return Err(PdfError::syntax(format!(
                "{open_states} `q` without matching `Q` at end of content"
            )));
        }
        if self.text.is_some() {
            return Err(PdfError::syntax("`BT` without matching `ET` at end of content"));
        }
        if self.compat_depth > self.compat_floor {
            return Err(PdfError::syntax("`BX` without matching `EX` at end of content"));
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.options.cancel {
            Some(token) if token.is_cancelled() => Err(PdfError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Downgrades an operator error to a warning inside `BX`/`EX`.
    fn recover(&self, err: PdfError) -> Result<()> {
        if self.compat == CompatMode::Lenient && err.is_recoverable_in_compat() {
            warn!(error = %err, "skipping operator inside BX/EX section");
            Ok(())
        } else {
            Err(err)
        }
    }

    fn push_token(&mut self, token: Token) -> Result<()> {
        match token {
            Token::Operator(op) if op == "null" => {
                self.operands.push(PDFObject::Null);
                Ok(())
            }
            Token::Operator(op) => {
                let operands = std::mem::take(&mut self.operands);
                self.dict_marks.clear();
                self.execute(&op, &operands)
            }
            Token::DictOpen => {
                self.dict_marks.push(self.operands.len());
                Ok(())
            }
            Token::DictClose => self.close_dict(),
            other => {
                self.operands.push(token_to_object(other));
                Ok(())
            }
        }
    }

    /// Folds the operands since the matching `<<` into a dictionary.
    fn close_dict(&mut self) -> Result<()> {
        let Some(start) = self.dict_marks.pop() else {
            return Err(PdfError::syntax("`>>` without matching `<<`"));
        };
        let items: Vec<PDFObject> = self.operands.drain(start..).collect();
        if items.len() % 2 != 0 {
            return Err(PdfError::syntax("dictionary operand with a key but no value"));
        }
        let mut dict = PDFDict::new();
        for (key, value) in items.into_iter().tuples() {
            let PDFObject::Name(key) = key else {
                return Err(PdfError::syntax(format!(
                    "dictionary key is a {}, not a name",
                    key.type_name()
                )));
            };
            dict.insert(key, value);
        }
        self.operands.push(PDFObject::Dict(dict));
        Ok(())
    }

    fn execute(&mut self, op: &str, args: &[PDFObject]) -> Result<()> {
        let Some(arity) = arity(op) else {
            return Err(PdfError::syntax(format!("unknown operator `{op}`")));
        };
        if let Arity::Exact(n) = arity
            && args.len() != n
        {
            return Err(PdfError::syntax(format!(
                "`{op}` takes {n} operands, got {}",
                args.len()
            )));
        }
        trace!(op, operands = args.len(), "dispatch");
        self.dispatch(op, args)
    }

    fn dispatch(&mut self, op: &str, args: &[PDFObject]) -> Result<()> {
        match op {
            // Graphics state
            "q" => self.do_q(),
            "Q" => self.do_Q(),
            "cm" => self.do_cm(matrix_operand(op, args)?),
            "w" => self.do_w(number_operand(op, args, 0)?),
            "J" => self.do_J(number_operand(op, args, 0)?),
            "j" => self.do_j(number_operand(op, args, 0)?),
            "M" => self.do_M(number_operand(op, args, 0)?),
            "d" => self.do_d(&args[0], number_operand(op, args, 1)?),
            "ri" => self.do_ri(name_operand(op, args, 0)?),
            "i" => self.do_i(number_operand(op, args, 0)?),
            "gs" => self.do_gs(name_operand(op, args, 0)?),

            // Path construction and painting
            "m" => self.do_m(number_operand(op, args, 0)?, number_operand(op, args, 1)?),
            "l" => self.do_l(number_operand(op, args, 0)?, number_operand(op, args, 1)?),
            "c" => {
                let [x1, y1, x2, y2, x3, y3] = numbers(op, args)?;
                self.do_c((x1, y1), (x2, y2), (x3, y3))
            }
            "v" => {
                let [x2, y2, x3, y3] = numbers(op, args)?;
                self.do_v((x2, y2), (x3, y3))
            }
            "y" => {
                let [x1, y1, x3, y3] = numbers(op, args)?;
                self.do_y((x1, y1), (x3, y3))
            }
            "h" => self.do_h(),
            "re" => {
                let [x, y, w, h] = numbers(op, args)?;
                self.do_re(x, y, w, h)
            }
            "S" => self.do_S(),
            "s" => self.do_s(),
            "f" | "F" => self.do_f(),
            "f*" => self.do_f_star(),
            "B" => self.do_B(),
            "B*" => self.do_B_star(),
            "b" => self.do_b(),
            "b*" => self.do_b_star(),
            "n" => self.do_n(),
            "W" => self.do_W(),
            "W*" => self.do_W_star(),

            // Colour
            "g" => self.do_g(number_operand(op, args, 0)?),
            "G" => self.do_G(number_operand(op, args, 0)?),
            "rg" => {
                let [r, g, b] = numbers(op, args)?;
                self.do_rg(r, g, b)
            }
            "RG" => {
                let [r, g, b] = numbers(op, args)?;
                self.do_RG(r, g, b)
            }
            "k" => {
                let [c, m, y, k] = numbers(op, args)?;
                self.do_k(c, m, y, k)
            }
            "K" => {
                let [c, m, y, k] = numbers(op, args)?;
                self.do_K(c, m, y, k)
            }
            "cs" => self.do_cs(name_operand(op, args, 0)?),
            "CS" => self.do_CS(name_operand(op, args, 0)?),
            "sc" | "scn" => self.do_scn(args),
            "SC" | "SCN" => self.do_SCN(args),
            "sh" => self.do_sh(name_operand(op, args, 0)?),

            // Text
            "BT" => self.do_BT(),
            "ET" => self.do_ET(),
            "Tc" => self.do_Tc(number_operand(op, args, 0)?),
            "Tw" => self.do_Tw(number_operand(op, args, 0)?),
            "Tz" => self.do_Tz(number_operand(op, args, 0)?),
            "TL" => self.do_TL(number_operand(op, args, 0)?),
            "Tf" => self.do_Tf(name_operand(op, args, 0)?, number_operand(op, args, 1)?),
            "Tr" => self.do_Tr(number_operand(op, args, 0)?),
            "Ts" => self.do_Ts(number_operand(op, args, 0)?),
            "Td" => self.do_Td(number_operand(op, args, 0)?, number_operand(op, args, 1)?),
            "TD" => self.do_TD(number_operand(op, args, 0)?, number_operand(op, args, 1)?),
            "Tm" => self.do_Tm(matrix_operand(op, args)?),
            "T*" => self.do_T_star(),
            "Tj" => self.do_Tj(&args[0]),
            "TJ" => self.do_TJ(&args[0]),
            "'" => self.do_quote(&args[0]),
            "\"" => self.do_doublequote(
                number_operand(op, args, 0)?,
                number_operand(op, args, 1)?,
                &args[2],
            ),

            // XObjects, inline images, marked content
            "Do" => self.do_Do(name_operand(op, args, 0)?),
            "BI" => self.do_BI(),
            "ID" => self.do_ID(args),
            "EI" => self.do_EI(&args[0]),
            "BMC" => self.do_BMC(name_operand(op, args, 0)?),
            "BDC" => self.do_BDC(name_operand(op, args, 0)?, &args[1]),
            "EMC" => self.do_EMC(),
            "MP" => self.do_MP(name_operand(op, args, 0)?),
            "DP" => self.do_DP(name_operand(op, args, 0)?, &args[1]),
            "d0" => self.do_d0(number_operand(op, args, 0)?, number_operand(op, args, 1)?),
            "d1" => {
                let [wx, wy, llx, lly, urx, ury] = numbers(op, args)?;
                self.do_d1(wx, wy, (llx, lly, urx, ury))
            }

            // Compatibility sections
            "BX" => self.do_BX(),
            "EX" => self.do_EX(),

            _ => Err(PdfError::syntax(format!("unknown operator `{op}`"))),
        }
    }

    /// Looks up `name` in the `category` subdictionary of the innermost
    /// resources. The value is returned unresolved.
    pub(crate) fn find_resource(&self, category: &str, name: &str) -> Result<Option<PDFObject>> {
        let Some(resources) = self.resource_stack.last() else {
            return Ok(None);
        };
        let Some(entries) = resources.get(category) else {
            return Ok(None);
        };
        let entries = self.doc.resolve_shared(entries)?;
        Ok(entries.as_dict().ok().and_then(|d| d.get(name).cloned()))
    }

    pub(crate) fn lookup_resource(&self, category: &str, name: &str) -> Result<PDFObject> {
        self.find_resource(category, name)?
            .ok_or_else(|| PdfError::syntax(format!("no /{category} resource named /{name}")))
    }

    /// Loads a font resource through the font factory, once per font
    /// dictionary.
    pub(crate) fn load_font(&self, obj: &PDFObject) -> Result<Arc<LoadedFont>> {
        self.resources.font(ResourceKey::of(obj), || {
            let dict = self.doc.resolve_dict(obj)?;
            let name = |key: &str| match dict.get(key) {
                Some(PDFObject::Name(n)) => n.clone(),
                _ => String::new(),
            };
            let factory = &self.factories.font;
            let context = self.handler.font_metrics_context();
            let font = LoadedFont {
                objid: match obj {
                    PDFObject::Ref(r) => Some(r.objid),
                    _ => None,
                },
                base_font: name("BaseFont"),
                subtype: name("Subtype"),
                font: factory.get_font(&dict, self.doc, context.as_ref()),
                mapper: factory.get_glyph_mapper(&dict, self.doc),
                widths: factory.get_glyph_widths(&dict, self.doc),
                dict,
            };
            debug!(base_font = %font.base_font, subtype = %font.subtype, "font loaded");
            Ok(Arc::new(font))
        })
    }

    /// Resolved dictionary value.
    pub(crate) fn dict_value(&self, dict: &PDFDict, key: &str) -> Result<Option<PDFObject>> {
        dict.get(key).map(|v| self.doc.resolve(v)).transpose()
    }

    pub(crate) fn dict_num(&self, dict: &PDFDict, key: &str) -> Result<Option<f64>> {
        self.dict_value(dict, key)?
            .map(|v| v.as_num().map_err(|e| bad_entry(key, e)))
            .transpose()
    }

    pub(crate) fn dict_int(&self, dict: &PDFDict, key: &str) -> Result<Option<i64>> {
        self.dict_value(dict, key)?
            .map(|v| v.as_int().map_err(|e| bad_entry(key, e)))
            .transpose()
    }

    pub(crate) fn dict_matrix(&self, dict: &PDFDict, key: &str) -> Result<Option<Matrix>> {
        let Some(value) = self.dict_value(dict, key)? else {
            return Ok(None);
        };
        match value.as_numbers().map_err(|e| bad_entry(key, e))?.as_slice() {
            &[a, b, c, d, e, f] => Ok(Some((a, b, c, d, e, f))),
            other => Err(PdfError::syntax(format!(
                "/{key} needs 6 numbers, got {}",
                other.len()
            ))),
        }
    }

    pub(crate) fn dict_rect(&self, dict: &PDFDict, key: &str) -> Result<Option<Rect>> {
        let Some(value) = self.dict_value(dict, key)? else {
            return Ok(None);
        };
        match value.as_numbers().map_err(|e| bad_entry(key, e))?.as_slice() {
            &[x0, y0, x1, y1] => Ok(Some(normalize_rect((x0, y0, x1, y1)))),
            other => Err(PdfError::syntax(format!(
                "/{key} needs 4 numbers, got {}",
                other.len()
            ))),
        }
    }
}

fn bad_entry(key: &str, err: PdfError) -> PdfError {
    PdfError::syntax(format!("bad /{key} entry: {err}"))
}

/// Converts a content token into an operand. Integral numbers become
/// integers so dictionaries built from operands read like parsed ones.
pub(crate) fn token_to_object(token: Token) -> PDFObject {
    match token {
        Token::Number(n) => number_object(n),
        Token::Name(name) => PDFObject::Name(name),
        Token::LiteralString(s) | Token::InlineImageData(s) => PDFObject::String(s),
        Token::Boolean(b) => PDFObject::Bool(b),
        Token::Array(items) => array_object(items),
        Token::Operator(word) if word == "null" => PDFObject::Null,
        Token::Operator(word) => PDFObject::Name(word),
        // Dictionary brackets only reach here from inside arrays.
        Token::DictOpen | Token::DictClose => PDFObject::Null,
    }
}

fn number_object(n: f64) -> PDFObject {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        PDFObject::Int(n as i64)
    } else {
        PDFObject::Real(n)
    }
}

/// Array operand; `<< >>` groups inside it become dictionaries.
fn array_object(items: Vec<Token>) -> PDFObject {
    let mut levels: Vec<Vec<PDFObject>> = vec![Vec::new()];
    let fold = |entries: Vec<PDFObject>| -> PDFDict {
        entries
            .into_iter()
            .tuples()
            .filter_map(|(k, v)| match k {
                PDFObject::Name(k) => Some((k, v)),
                _ => None,
            })
            .collect()
    };
    for item in items {
        match item {
            Token::DictOpen => levels.push(Vec::new()),
            Token::DictClose if levels.len() > 1 => {
                let entries = levels.pop().unwrap_or_default();
                if let Some(parent) = levels.last_mut() {
                    parent.push(PDFObject::Dict(fold(entries)));
                }
            }
            Token::DictClose => {}
            other => {
                if let Some(top) = levels.last_mut() {
                    top.push(token_to_object(other));
                }
            }
        }
    }
    while levels.len() > 1 {
        let entries = levels.pop().unwrap_or_default();
        if let Some(parent) = levels.last_mut() {
            parent.push(PDFObject::Dict(fold(entries)));
        }
    }
    PDFObject::Array(levels.pop().unwrap_or_default())
}

pub(crate) fn number_operand(op: &str, args: &[PDFObject], index: usize) -> Result<f64> {
    match args.get(index) {
        Some(arg) => arg.as_num().map_err(|_| {
            PdfError::syntax(format!(
                "`{op}` operand {index} must be a number, got {}",
                arg.type_name()
            ))
        }),
        None => Err(PdfError::syntax(format!("`{op}` is missing operand {index}"))),
    }
}

pub(crate) fn name_operand<'o>(op: &str, args: &'o [PDFObject], index: usize) -> Result<&'o str> {
    match args.get(index) {
        Some(arg) => arg.as_name().map_err(|_| {
            PdfError::syntax(format!(
                "`{op}` operand {index} must be a name, got {}",
                arg.type_name()
            ))
        }),
        None => Err(PdfError::syntax(format!("`{op}` is missing operand {index}"))),
    }
}

/// Reads the first `N` operands as numbers.
pub(crate) fn numbers<const N: usize>(op: &str, args: &[PDFObject]) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = number_operand(op, args, i)?;
    }
    Ok(out)
}

fn matrix_operand(op: &str, args: &[PDFObject]) -> Result<Matrix> {
    let [a, b, c, d, e, f] = numbers(op, args)?;
    Ok((a, b, c, d, e, f))
}

/// Interprets every page of `doc`, continuing past failed pages.
///
/// Returns the errors by page index. Cancellation stops the walk.
pub fn render_pages<H: MarkupHandler + ?Sized>(
    doc: &PDFDocument,
    factories: &Factories,
    resources: &ResourceManager,
    handler: &mut H,
    options: &InterpreterOptions,
) -> Vec<(usize, PdfError)> {
    let mut errors = Vec::new();
    for index in 0..doc.page_count() {
        let result = doc.page(index).and_then(|page| {
            PageInterpreter::new(doc, factories, resources, &mut *handler)
                .with_options(options.clone())
                .process_page(&page)
        });
        match result {
            Ok(()) => {}
            Err(PdfError::Cancelled) => {
                errors.push((index, PdfError::Cancelled));
                break;
            }
            Err(err) => {
                warn!(page = index, error = %err, "page failed");
                errors.push((index, err));
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_table() {
        assert_eq!(arity("re"), Some(Arity::Exact(4)));
        assert_eq!(arity("scn"), Some(Arity::Variable));
        assert_eq!(arity("\""), Some(Arity::Exact(3)));
        assert_eq!(arity("foo"), None);
    }

    #[test]
    fn test_operand_conversion() {
        assert_eq!(token_to_object(Token::Number(2.0)), PDFObject::Int(2));
        assert_eq!(token_to_object(Token::Number(0.5)), PDFObject::Real(0.5));
        let arr = token_to_object(Token::Array(vec![
            Token::Name("A".into()),
            Token::DictOpen,
            Token::Name("K".into()),
            Token::Number(1.0),
            Token::DictClose,
            Token::Operator("null".into()),
        ]));
        let PDFObject::Array(items) = arr else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_dict().unwrap().get("K"), Some(&PDFObject::Int(1)));
        assert!(items[2].is_null());
    }

    #[test]
    fn test_numbers_reports_operator() {
        let args = [PDFObject::Int(1), PDFObject::Name("x".into())];
        let err = numbers::<2>("m", &args).unwrap_err();
        assert!(err.to_string().contains("`m` operand 1"));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let copy = token.clone();
        copy.cancel();
        assert!(token.is_cancelled());
    }
}
