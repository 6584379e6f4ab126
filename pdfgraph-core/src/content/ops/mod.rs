//! Operator implementations, one `impl Interpreter` block per group:
//! - `path` - construction and painting (m, l, c, v, y, h, re, S, s, f, F, f\*, B, B\*, b, b\*, n, W, W\*)
//! - `graphics_state` - q, Q, cm, w, J, j, M, d, ri, i, gs
//! - `color` - g, G, rg, RG, k, K, cs, CS, sc, scn, SC, SCN, sh
//! - `text` - BT, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, TD, Tm, T\*, Tj, TJ, ', "
//! - `xobject` - Do, inline images, marked content

mod color;
mod graphics_state;
mod path;
mod text;
mod xobject;
