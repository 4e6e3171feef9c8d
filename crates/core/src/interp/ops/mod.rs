//! Content stream operator implementations.
//!
//! Operators are grouped by category:
//! - `graphics_state` - State stack, transforms and compatibility sections (q, Q, cm, w, J, j, M, d, ri, i, gs, BX, EX)
//! - `path` - Path construction, painting and clipping (m, l, c, v, y, h, re, S, s, f, F, f\*, B, B\*, b, b\*, n, W, W\*)
//! - `color` - Colour spaces and values (G, g, RG, rg, K, k, CS, cs, SC, SCN, sc, scn)
//! - `pattern` - Shadings and pattern paints (sh)
//! - `text` - Text state, positioning and showing (BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, TD, Tm, T\*, Tj, TJ, ', ")
//! - `xobject` - XObjects, inline images, marked content and Type 3 glyph metrics (Do, BI, ID, EI, BMC, BDC, EMC, MP, DP, d0, d1)

mod color;
mod graphics_state;
mod path;
mod pattern;
mod text;
mod xobject;
