//! Lowers a [`ProgramGraph`] to a single HLS C++ function.
//!
//! The generated file has the shape:
//! ```text
//! // <header>
//! #include "ap_int.h"
//! #include "ap_fixed.h"
//!
//! void top(<inputs>, <outputs by reference>, <arrays>) {
//!   <interface pragmas>
//!   <local declarations>
//!   <statements>
//! }
//! ```
use crate::traits::Backend;
use hlsfuzz_ir::{
    ArrayRole, Bound, EdgeRole, Node, NodeRef, OpKind, ProgramGraph,
};
use hlsfuzz_utils::{Error, FuzzResult, OutputFile};
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Instant;

/// Indentation used for every nesting level.
const INDENT: &str = "  ";

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

/// Function arguments of a program, each category in creation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Arguments {
    /// Ops without predecessors, passed by value.
    pub inputs: Vec<NodeRef>,
    /// Ops without successors, passed by reference.
    pub outputs: Vec<NodeRef>,
    /// Every array, passed as a fixed-length array.
    pub arrays: Vec<NodeRef>,
}

impl Arguments {
    pub fn classify(prog: &ProgramGraph) -> FuzzResult<Self> {
        let mut args = Arguments::default();
        for r in prog.node_refs() {
            match prog.node(r)? {
                Node::Array(_) => args.arrays.push(r),
                Node::Op(_) if prog.predecessors(r).is_empty() => {
                    args.inputs.push(r)
                }
                Node::Op(_) if prog.successors(r).is_empty() => {
                    args.outputs.push(r)
                }
                _ => (),
            }
        }
        if args.is_empty() {
            return Err(Error::malformed_structure(format!(
                "function `{}` has no inputs, outputs or arrays",
                prog.function_name()
            )));
        }
        log::debug!(
            "Arguments of `{}`: inputs [{}], outputs [{}], arrays [{}]",
            prog.function_name(),
            names(prog, &args.inputs),
            names(prog, &args.outputs),
            names(prog, &args.arrays)
        );
        Ok(args)
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
            && self.outputs.is_empty()
            && self.arrays.is_empty()
    }

    pub fn contains(&self, r: NodeRef) -> bool {
        self.inputs.contains(&r)
            || self.outputs.contains(&r)
            || self.arrays.contains(&r)
    }
}

/// The pieces of a generated function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    /// `void name(...) {`
    pub declaration: String,
    pub interface_pragmas: String,
    pub variable_decls: String,
    /// Statements of the function, without the closing brace.
    pub body: String,
}

impl GeneratedProgram {
    /// Assemble the complete source file. Every line of `header` becomes a
    /// line comment at the top of the file.
    pub fn to_source(&self, header: Option<&str>) -> String {
        let mut src = String::new();
        if let Some(header) = header {
            for line in header.lines() {
                src.push_str(&format!("// {line}\n"));
            }
        }
        src.push_str("#include \"ap_int.h\"\n");
        src.push_str("#include \"ap_fixed.h\"\n\n");
        src.push_str(&self.declaration);
        src.push_str(&self.interface_pragmas);
        src.push_str(&self.variable_decls);
        src.push_str(&self.body);
        src.push_str("}\n");
        src
    }

    /// Non-empty statement lines of the body, without indentation.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.body.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Lowers one program graph. The set of emitted nodes lives only as long as
/// one call to [`CodeGenerator::generate`].
pub struct CodeGenerator<'a> {
    prog: &'a ProgramGraph,
    args: Arguments,
    emitted: HashSet<NodeRef>,
}

impl<'a> CodeGenerator<'a> {
    /// Lower `prog` into its declaration, pragmas, locals and body.
    pub fn generate(prog: &'a ProgramGraph) -> FuzzResult<GeneratedProgram> {
        let mut codegen = CodeGenerator {
            prog,
            args: Arguments::classify(prog)?,
            emitted: HashSet::new(),
        };
        Ok(GeneratedProgram {
            declaration: codegen.declaration()?,
            interface_pragmas: codegen.interface_pragmas()?,
            variable_decls: codegen.variable_decls()?,
            body: codegen.body()?,
        })
    }

    fn name(&self, r: NodeRef) -> FuzzResult<String> {
        Ok(self.prog.node(r)?.name().to_string())
    }

    fn declaration(&self) -> FuzzResult<String> {
        let prog = self.prog;
        let inputs = self.args.inputs.iter().map(|r| -> FuzzResult<String> {
            let op = prog.op(*r)?;
            Ok(format!("{} {}", op.ty.spelling()?, op.name))
        });
        let outputs = self.args.outputs.iter().map(|r| -> FuzzResult<String> {
            let op = prog.op(*r)?;
            Ok(format!("{} &{}", op.ty.spelling()?, op.name))
        });
        let arrays = self.args.arrays.iter().map(|r| -> FuzzResult<String> {
            let arr = prog.array(*r)?;
            Ok(format!("{} {}[{}]", arr.ty.spelling()?, arr.name, arr.length))
        });
        let params = inputs
            .chain(outputs)
            .chain(arrays)
            .collect::<FuzzResult<Vec<String>>>()?;
        Ok(format!(
            "void {}({}) {{\n",
            prog.function_name(),
            params.join(", ")
        ))
    }

    fn interface_pragmas(&self) -> FuzzResult<String> {
        let mut out = String::new();
        for r in &self.args.arrays {
            let arr = self.prog.array(*r)?;
            writeln!(
                out,
                "{}#pragma HLS interface ap_memory storage_type={} port={}",
                indent(1),
                arr.port,
                arr.name
            )?;
        }
        Ok(out)
    }

    fn variable_decls(&self) -> FuzzResult<String> {
        let mut out = String::new();
        for r in self.prog.ops() {
            if self.args.contains(r) {
                continue;
            }
            let op = self.prog.op(r)?;
            writeln!(out, "{}{} {};", indent(1), op.ty.spelling()?, op.name)?;
        }
        Ok(out)
    }

    /// Emit the top-level statements. Loops and branches emit their members
    /// themselves.
    fn body(&mut self) -> FuzzResult<String> {
        let mut out = String::new();
        let prog = self.prog;
        let roots = prog
            .node_refs()
            .filter(|r| {
                prog.node(*r).is_ok_and(|n| !n.is_array())
                    && prog.structural_parents(*r).is_empty()
            })
            .collect_vec();
        self.emit_block(&roots, 1, &mut out)?;
        Ok(out)
    }

    fn emit_node(
        &mut self,
        r: NodeRef,
        level: usize,
        out: &mut String,
    ) -> FuzzResult<()> {
        if !self.emitted.insert(r) {
            return Err(Error::malformed_structure(format!(
                "`{}` is emitted twice",
                self.name(r)?
            )));
        }
        match self.prog.node(r)? {
            Node::Loop(_) => self.emit_loop(r, level, out),
            Node::Branch(_) => self.emit_branch(r, level, out),
            Node::Op(_) => self.emit_op(r, level, out),
            Node::Literal(_) => Ok(()),
            Node::Array(arr) => Err(Error::malformed_structure(format!(
                "array `{}` cannot be emitted as a statement",
                arr.name
            ))),
        }
    }

    /// Emit the members of one block so that every value read inside a
    /// member's subtree is assigned before it.
    fn emit_block(
        &mut self,
        nodes: &[NodeRef],
        level: usize,
        out: &mut String,
    ) -> FuzzResult<()> {
        let order = self.prog.block_order(nodes)?;
        for r in order {
            self.emit_node(r, level, out)?;
        }
        Ok(())
    }

    fn bound_text(&self, bound: Bound) -> FuzzResult<String> {
        match bound {
            Bound::Literal(v) => Ok(v.to_string()),
            Bound::Op(r) => Ok(self.prog.op(r)?.name.to_string()),
        }
    }

    fn emit_loop(
        &mut self,
        r: NodeRef,
        level: usize,
        out: &mut String,
    ) -> FuzzResult<()> {
        let l = self.prog.loop_node(r)?;
        l.check_pragma_status()?;
        let var = l.loop_var();
        let ind = indent(level);
        let inner = indent(level + 1);
        writeln!(
            out,
            "{ind}for (int {var} = {}; {var} <= {}; {var} += {}) {{",
            self.bound_text(l.start)?,
            self.bound_text(l.end)?,
            l.step
        )?;
        let pragmas = l.pragmas;
        if pragmas.pipelined {
            writeln!(out, "{inner}#pragma HLS pipeline")?;
        } else {
            writeln!(out, "{inner}#pragma HLS pipeline off")?;
        }
        if pragmas.flattened {
            writeln!(out, "{inner}#pragma HLS loop_flatten")?;
        }
        if pragmas.unrolled {
            if pragmas.fully_unrolled {
                writeln!(out, "{inner}#pragma HLS unroll")?;
            } else {
                writeln!(
                    out,
                    "{inner}#pragma HLS unroll factor={}",
                    pragmas.unroll_factor
                )?;
            }
        }
        let children = self.prog.structural_children(r);
        self.emit_block(&children, level + 1, out)?;
        writeln!(out, "{ind}}}")?;
        Ok(())
    }

    fn emit_branch(
        &mut self,
        r: NodeRef,
        level: usize,
        out: &mut String,
    ) -> FuzzResult<()> {
        let cond = self.prog.single_source(r, EdgeRole::Condition)?;
        let (taken, not_taken) = self.prog.branch_arms(r)?;
        let ind = indent(level);
        writeln!(out, "{ind}if ({}) {{", self.name(cond)?)?;
        self.emit_block(&taken, level + 1, out)?;
        writeln!(out, "{ind}}} else {{")?;
        self.emit_block(&not_taken, level + 1, out)?;
        writeln!(out, "{ind}}}")?;
        Ok(())
    }

    /// Text of an array index: a literal, an op or a loop variable in scope.
    fn index_text(&self, access: NodeRef, idx: NodeRef) -> FuzzResult<String> {
        match self.prog.node(idx)? {
            Node::Literal(lit) => Ok(lit.value.to_string()),
            Node::Op(op) => Ok(op.name.to_string()),
            Node::Loop(l) => {
                if !self.nested_in(access, idx)? {
                    return Err(Error::malformed_structure(format!(
                        "`{}` uses `{}` outside of loop `{}`",
                        self.name(access)?,
                        l.loop_var(),
                        l.name
                    )));
                }
                Ok(l.loop_var())
            }
            other => Err(Error::invalid_argument(format!(
                "{} cannot be used as an array index",
                other.describe()
            ))),
        }
    }

    /// True if `r` is transitively nested inside `ancestor`.
    fn nested_in(&self, r: NodeRef, ancestor: NodeRef) -> FuzzResult<bool> {
        let mut cur = r;
        while let Some(parent) = self.prog.structural_parent(cur)? {
            if parent == ancestor {
                return Ok(true);
            }
            cur = parent;
        }
        Ok(false)
    }

    fn emit_op(
        &mut self,
        r: NodeRef,
        level: usize,
        out: &mut String,
    ) -> FuzzResult<()> {
        // Inputs are assigned by the caller.
        if self.args.inputs.contains(&r) {
            return Ok(());
        }
        let prog = self.prog;
        let op = prog.op(r)?;
        let ind = indent(level);
        match op.kind {
            OpKind::Visit => {
                let arr =
                    prog.single_source(r, EdgeRole::Array(ArrayRole::Array))?;
                let idx =
                    prog.single_source(r, EdgeRole::Array(ArrayRole::Address))?;
                writeln!(
                    out,
                    "{ind}{} = {}[{}];",
                    op.name,
                    self.name(arr)?,
                    self.index_text(r, idx)?
                )?;
            }
            OpKind::Write => {
                let arr = prog.single_target(r)?;
                let idx =
                    prog.single_source(r, EdgeRole::Array(ArrayRole::Address))?;
                let value = prog
                    .single_source(r, EdgeRole::Array(ArrayRole::WriteValue))?;
                if idx == value {
                    log::warn!(
                        "`{}` uses `{}` as both address and value",
                        op.name,
                        self.name(idx)?
                    );
                }
                writeln!(
                    out,
                    "{ind}{}[{}] = {};",
                    self.name(arr)?,
                    self.index_text(r, idx)?,
                    self.name(value)?
                )?;
            }
            kind => {
                let operator = kind.operator().ok_or_else(|| {
                    Error::unsupported(format!(
                        "no C++ operator for {kind} op `{}`",
                        op.name
                    ))
                })?;
                let operands = (0..kind.arity())
                    .map(|slot| {
                        prog.single_source(r, EdgeRole::Operand(slot as u8))
                    })
                    .collect::<FuzzResult<Vec<_>>>()?;
                match operands.as_slice() {
                    [a] => {
                        writeln!(
                            out,
                            "{ind}{} = {operator}{};",
                            op.name,
                            self.name(*a)?
                        )?;
                    }
                    [a, b] => {
                        if a == b {
                            log::warn!(
                                "`{}` reads `{}` in both operand slots",
                                op.name,
                                self.name(*a)?
                            );
                        }
                        let fixed_amount = prog.op(*b)?.ty.is_fixed();
                        let rhs = if kind.is_shift() && fixed_amount {
                            format!("(int){}", self.name(*b)?)
                        } else {
                            self.name(*b)?
                        };
                        writeln!(
                            out,
                            "{ind}{} = {} {operator} {rhs};",
                            op.name,
                            self.name(*a)?
                        )?;
                    }
                    _ => {
                        return Err(Error::unsupported(format!(
                            "{kind} op `{}` with {} operands",
                            op.name,
                            operands.len()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Emits a program as a Vitis-style HLS C++ source file.
#[derive(Debug, Default, Clone)]
pub struct HlsCppBackend {
    header: Option<String>,
}

impl HlsCppBackend {
    /// Backend that starts every file with `header` as a comment.
    pub fn with_header<S: Into<String>>(header: S) -> Self {
        Self {
            header: Some(header.into()),
        }
    }

    /// Lower `prog` to the complete source text.
    pub fn render(&self, prog: &ProgramGraph) -> FuzzResult<String> {
        let program = CodeGenerator::generate(prog)?;
        Ok(program.to_source(self.header.as_deref()))
    }
}

impl Backend for HlsCppBackend {
    fn name(&self) -> &'static str {
        "hls-cpp"
    }

    fn validate(prog: &ProgramGraph) -> FuzzResult<()> {
        prog.validate()?;
        // Memory ops are lowered separately, every other kind needs an
        // operator.
        if let Some(op) = prog
            .ops()
            .into_iter()
            .filter_map(|r| prog.op(r).ok())
            .find(|op| !op.kind.is_memory() && op.kind.operator().is_none())
        {
            return Err(Error::unsupported(format!(
                "{} op `{}` has no C++ mapping",
                op.kind, op.name
            )));
        }
        Ok(())
    }

    fn emit(
        &self,
        prog: &ProgramGraph,
        file: &mut OutputFile,
    ) -> FuzzResult<()> {
        let time = Instant::now();
        let src = self.render(prog)?;
        let out = &mut file.get_write()?;
        out.write_all(src.as_bytes()).map_err(|err| {
            Error::write_error(format!(
                "cannot write {}: {err}",
                file.as_path_string()
            ))
        })?;
        out.flush()?;
        log::info!(
            "Generated `{}` with {} in {:?}",
            prog.function_name(),
            self.name(),
            time.elapsed()
        );
        Ok(())
    }
}

/// Names of the nodes in `refs`, for diagnostics.
fn names(prog: &ProgramGraph, refs: &[NodeRef]) -> String {
    refs.iter()
        .filter_map(|r| prog.node(*r).ok())
        .map(|n| n.name())
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsfuzz_ir::{BoundSide, LoopPragmas, PortType, ResultType};
    use hlsfuzz_utils::ErrorKind;

    fn int8() -> ResultType {
        ResultType::int(8)
    }

    /// `op_0 = i0 + i1` with both inputs signed 8-bit.
    fn adder() -> (ProgramGraph, NodeRef) {
        let mut g = ProgramGraph::new();
        let i0 = g.add_input(OpKind::Add, int8()).unwrap();
        let i1 = g.add_input(OpKind::Add, int8()).unwrap();
        let op = g.add_op(OpKind::Add, ResultType::int(9)).unwrap();
        g.connect(i0, op, EdgeRole::Operand(0)).unwrap();
        g.connect(i1, op, EdgeRole::Operand(1)).unwrap();
        (g, op)
    }

    #[test]
    fn single_adder() {
        let (g, op) = adder();
        let args = Arguments::classify(&g).unwrap();
        assert_eq!(args.outputs, vec![op]);
        let program = CodeGenerator::generate(&g).unwrap();
        assert_eq!(
            program.declaration,
            "void top(ap_int<8> i0, ap_int<8> i1, ap_int<9> &op_0) {\n"
        );
        assert_eq!(program.interface_pragmas, "");
        assert_eq!(program.variable_decls, "");
        assert_eq!(program.statements().collect_vec(), vec!["op_0 = i0 + i1;"]);
    }

    #[test]
    fn pipelined_loop() {
        let (mut g, op) = adder();
        let l = g.add_loop(Bound::Literal(0), Bound::Literal(9), 1).unwrap();
        g.connect(l, op, EdgeRole::LoopBody).unwrap();
        g.loop_node_mut(l).unwrap().pragmas = LoopPragmas {
            pipelined: true,
            ..LoopPragmas::default()
        };
        let src = HlsCppBackend::default().render(&g).unwrap();
        assert!(src.contains(concat!(
            "  for (int loop_0_loop_var = 0; loop_0_loop_var <= 9; ",
            "loop_0_loop_var += 1) {\n"
        )));
        assert!(src.contains("    #pragma HLS pipeline\n"));
        assert!(!src.contains("pipeline off"));
        assert!(!src.contains("unroll"));
        assert!(src.contains("    op_0 = i0 + i1;\n"));
    }

    #[test]
    fn unroll_pragmas() {
        let (mut g, op) = adder();
        let l = g.add_loop(Bound::Literal(0), Bound::Op(op), 2).unwrap();
        let not = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(op, not, EdgeRole::Operand(0)).unwrap();
        g.connect(l, not, EdgeRole::LoopBody).unwrap();
        g.loop_node_mut(l).unwrap().pragmas = LoopPragmas {
            flattened: true,
            unrolled: true,
            unroll_factor: 4,
            ..LoopPragmas::default()
        };
        let src = HlsCppBackend::default().render(&g).unwrap();
        assert!(src.contains("loop_0_loop_var <= op_0;"));
        assert!(src.contains("#pragma HLS pipeline off\n"));
        assert!(src.contains("#pragma HLS loop_flatten\n"));
        assert!(src.contains("#pragma HLS unroll factor=4\n"));
        // `op_0` is a bound now, so it is a local rather than an output.
        assert!(src.contains("  ap_int<9> op_0;\n"));
        assert!(src.contains("ap_int<8> &op_1"));

        g.loop_node_mut(l).unwrap().pragmas = LoopPragmas {
            unrolled: true,
            fully_unrolled: true,
            ..LoopPragmas::default()
        };
        let src = HlsCppBackend::default().render(&g).unwrap();
        assert!(src.contains("#pragma HLS unroll\n"));

        g.loop_node_mut(l).unwrap().pragmas.unroll_factor = 8;
        let err = HlsCppBackend::default().render(&g).unwrap_err();
        assert!(err.is_structural());
        assert_eq!(
            g.sources_of(l, EdgeRole::LoopBound(BoundSide::End)),
            vec![op]
        );
    }

    #[test]
    fn branch_arms_and_shift_cast() {
        let mut g = ProgramGraph::new();
        let fixed = ResultType::fixed(
            16,
            8,
            hlsfuzz_ir::RoundingMode::Rnd,
            hlsfuzz_ir::OverflowMode::Sat,
        );
        let a = g.add_input(OpKind::Add, int8()).unwrap();
        let b = g.add_input(OpKind::Add, fixed).unwrap();
        let cond = g.add_op(OpKind::Lt, ResultType::uint(1)).unwrap();
        g.connect(a, cond, EdgeRole::Operand(0)).unwrap();
        g.connect(b, cond, EdgeRole::Operand(1)).unwrap();
        let br = g.add_branch().unwrap();
        g.connect(cond, br, EdgeRole::Condition).unwrap();
        let shl = g.add_op(OpKind::Shl, int8()).unwrap();
        g.connect(a, shl, EdgeRole::Operand(0)).unwrap();
        g.connect(b, shl, EdgeRole::Operand(1)).unwrap();
        g.connect(br, shl, EdgeRole::BranchBody(true)).unwrap();
        let neg = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(a, neg, EdgeRole::Operand(0)).unwrap();
        g.connect(br, neg, EdgeRole::BranchBody(false)).unwrap();

        HlsCppBackend::validate(&g).unwrap();
        let program = CodeGenerator::generate(&g).unwrap();
        assert_eq!(
            program.statements().collect_vec(),
            vec![
                "op_0 = i0 < i1;",
                "if (op_0) {",
                "op_1 = i0 << (int)i1;",
                "} else {",
                "op_2 = ~i0;",
                "}",
            ]
        );
        assert!(program.declaration.contains(
            "ap_fixed<16,8,AP_RND,AP_SAT> i1"
        ));
    }

    #[test]
    fn same_producer_in_both_slots_is_tolerated() {
        let mut g = ProgramGraph::new();
        let a = g.add_input(OpKind::Add, int8()).unwrap();
        let m = g.add_op(OpKind::Mul, int8()).unwrap();
        g.connect(a, m, EdgeRole::Operand(0)).unwrap();
        g.connect(a, m, EdgeRole::Operand(1)).unwrap();
        let program = CodeGenerator::generate(&g).unwrap();
        assert_eq!(program.statements().collect_vec(), vec!["op_0 = i0 * i0;"]);
    }

    #[test]
    fn array_accesses() {
        let mut g = ProgramGraph::new();
        let arr = g.add_array(int8(), 64, PortType::RamT2P).unwrap();
        let a = g.add_input(OpKind::Add, int8()).unwrap();
        let lit = g.add_literal(5).unwrap();
        let v = g.add_op(OpKind::Visit, int8()).unwrap();
        g.connect(arr, v, EdgeRole::Array(ArrayRole::Array)).unwrap();
        g.connect(lit, v, EdgeRole::Array(ArrayRole::Address)).unwrap();
        let l = g.add_loop(Bound::Literal(0), Bound::Literal(63), 1).unwrap();
        let w = g.add_op(OpKind::Write, int8()).unwrap();
        g.connect(v, w, EdgeRole::Array(ArrayRole::WriteValue)).unwrap();
        g.connect(l, w, EdgeRole::Array(ArrayRole::Address)).unwrap();
        g.connect(l, w, EdgeRole::LoopBody).unwrap();
        g.connect(w, arr, EdgeRole::Array(ArrayRole::Array)).unwrap();
        let w2 = g.add_op(OpKind::Write, int8()).unwrap();
        g.connect(a, w2, EdgeRole::Array(ArrayRole::WriteValue)).unwrap();
        g.connect(a, w2, EdgeRole::Array(ArrayRole::Address)).unwrap();
        g.connect(w2, arr, EdgeRole::Array(ArrayRole::Array)).unwrap();

        HlsCppBackend::validate(&g).unwrap();
        let program = CodeGenerator::generate(&g).unwrap();
        assert_eq!(
            program.declaration,
            "void top(ap_int<8> i0, ap_int<8> array_0[64]) {\n"
        );
        assert_eq!(
            program.interface_pragmas,
            concat!(
                "  #pragma HLS interface ap_memory storage_type=RAM_T2P ",
                "port=array_0\n"
            )
        );
        let stmts = program.statements().collect_vec();
        assert!(stmts.contains(&"visit_0 = array_0[5];"));
        assert!(stmts.contains(&"array_0[loop_0_loop_var] = visit_0;"));
        assert!(stmts.contains(&"array_0[i0] = i0;"));
        assert!(program.variable_decls.contains("ap_int<8> visit_0;"));
        assert!(program.variable_decls.contains("ap_int<8> write_1;"));
    }

    #[test]
    fn loop_variable_out_of_scope() {
        let mut g = ProgramGraph::new();
        let arr = g.add_array(int8(), 64, PortType::Ram1P).unwrap();
        let l = g.add_loop(Bound::Literal(0), Bound::Literal(3), 1).unwrap();
        let v = g.add_op(OpKind::Visit, int8()).unwrap();
        g.connect(arr, v, EdgeRole::Array(ArrayRole::Array)).unwrap();
        g.connect(l, v, EdgeRole::Array(ArrayRole::Address)).unwrap();
        let err = CodeGenerator::generate(&g).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn structural_errors() {
        // No arguments at all.
        let mut g = ProgramGraph::new();
        g.add_branch().unwrap();
        assert!(CodeGenerator::generate(&g).unwrap_err().is_structural());

        // Branch without a condition.
        let (mut g, op) = adder();
        let br = g.add_branch().unwrap();
        g.connect(br, op, EdgeRole::BranchBody(true)).unwrap();
        assert!(CodeGenerator::generate(&g).unwrap_err().is_structural());

        // Cycle among ops.
        let mut g = ProgramGraph::new();
        let a = g.add_input(OpKind::Add, int8()).unwrap();
        let x = g.add_op(OpKind::Add, int8()).unwrap();
        let y = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(a, x, EdgeRole::Operand(0)).unwrap();
        g.connect(y, x, EdgeRole::Operand(1)).unwrap();
        g.connect(x, y, EdgeRole::Operand(0)).unwrap();
        let out = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(y, out, EdgeRole::Operand(0)).unwrap();
        let err = CodeGenerator::generate(&g).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedStructure(_)));
    }

    #[test]
    fn header_and_includes() {
        let (g, _) = adder();
        let src = HlsCppBackend::with_header("seed 7\ncopy 1")
            .render(&g)
            .unwrap();
        assert!(src.starts_with(concat!(
            "// seed 7\n// copy 1\n",
            "#include \"ap_int.h\"\n#include \"ap_fixed.h\"\n\nvoid top("
        )));
        assert!(src.ends_with("}\n"));
        assert_eq!(names(&g, &g.ops()), "i0, i1, op_0");
    }

    /// `loop_0` is created before `op_0`, but its body reads `op_0`.
    fn loop_reading_a_later_op() -> (ProgramGraph, NodeRef) {
        let mut g = ProgramGraph::new();
        let i0 = g.add_input(OpKind::Not, int8()).unwrap();
        let l = g.add_loop(Bound::Literal(0), Bound::Literal(3), 1).unwrap();
        let a = g.add_op(OpKind::Not, int8()).unwrap();
        let b = g.add_op(OpKind::Not, int8()).unwrap();
        let c = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(i0, a, EdgeRole::Operand(0)).unwrap();
        g.connect(a, b, EdgeRole::Operand(0)).unwrap();
        g.connect(l, b, EdgeRole::LoopBody).unwrap();
        g.connect(b, c, EdgeRole::Operand(0)).unwrap();
        (g, l)
    }

    #[test]
    fn values_are_assigned_before_the_loop_reading_them() {
        let (g, _) = loop_reading_a_later_op();
        let src = HlsCppBackend::default().render(&g).unwrap();
        let pos = |needle: &str| src.find(needle).unwrap();
        assert!(pos("op_0 = ~i0;") < pos("for ("));
        assert!(pos("op_1 = ~op_0;") < pos("op_2 = ~op_1;"));
    }

    #[test]
    fn nested_blocks_are_ordered_by_their_reads() {
        let (mut g, outer) = loop_reading_a_later_op();
        // A branch inside `loop_0` whose condition is computed after it was
        // created, in the same loop body.
        let br = g.add_branch().unwrap();
        g.connect(outer, br, EdgeRole::LoopBody).unwrap();
        let cond = g.add_op(OpKind::Not, int8()).unwrap();
        let i0 = g.ops()[0];
        g.connect(i0, cond, EdgeRole::Operand(0)).unwrap();
        g.connect(outer, cond, EdgeRole::LoopBody).unwrap();
        g.connect(cond, br, EdgeRole::Condition).unwrap();
        let inner = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(cond, inner, EdgeRole::Operand(0)).unwrap();
        g.connect(br, inner, EdgeRole::BranchBody(true)).unwrap();
        let stmts = CodeGenerator::generate(&g)
            .unwrap()
            .statements()
            .map(str::to_string)
            .collect_vec();
        let pos = |s: &str| stmts.iter().position(|x| x == s).unwrap();
        assert!(pos("op_3 = ~i0;") < pos("if (op_3) {"));
        assert!(pos("if (op_3) {") < pos("op_4 = ~op_3;"));
    }

    #[test]
    fn blocks_reading_each_other_are_rejected() {
        let (mut g, l) = loop_reading_a_later_op();
        // `op_2` reads out of `loop_0` and feeds another op inside it.
        let c = g.ops()[3];
        let d = g.add_op(OpKind::Not, int8()).unwrap();
        g.connect(c, d, EdgeRole::Operand(0)).unwrap();
        g.connect(l, d, EdgeRole::LoopBody).unwrap();
        let err = CodeGenerator::generate(&g).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn backend_name() {
        assert_eq!(HlsCppBackend::default().name(), "hls-cpp");
    }
}
