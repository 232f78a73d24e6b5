//! Parser for `OpenQASM` 2.0.
//!
//! Recursive descent over the token stream, producing a [`Circuit`]. Gate
//! declarations become [`CustomGate`]s with declared factors, so parsed
//! programs flow through the same compiler lowering as hand-built
//! circuits.

use rustc_hash::{FxHashMap, FxHashSet};

use alsvid_ir::{
    Circuit, ClbitId, Comparator, Condition, CustomGate, GateFactor, GateKind, Instruction,
    ParameterExpression, QubitId, StandardGate,
};

use crate::error::{QasmError, QasmResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM 2.0 source string into a circuit.
pub fn parse(source: &str) -> QasmResult<Circuit> {
    Parser::new(source)?.parse_program()
}

struct RegInfo {
    start: u32,
    size: u32,
}

/// Parser state.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    qregs: FxHashMap<String, RegInfo>,
    cregs: FxHashMap<String, RegInfo>,
    gates: FxHashMap<String, CustomGate>,
}

impl Parser {
    fn new(source: &str) -> QasmResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            qregs: FxHashMap::default(),
            cregs: FxHashMap::default(),
            gates: FxHashMap::default(),
        })
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    #[allow(clippy::needless_pass_by_value)]
    fn expect(&mut self, expected: Token) -> QasmResult<()> {
        let found = self
            .advance()
            .ok_or_else(|| QasmError::UnexpectedEof(format!("expected {expected}")))?;
        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(QasmError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_identifier(&mut self) -> QasmResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(QasmError::UnexpectedToken {
                expected: "identifier".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof("identifier".into())),
        }
    }

    fn parse_int(&mut self) -> QasmResult<u64> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => Err(QasmError::UnexpectedToken {
                expected: "integer".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof("integer".into())),
        }
    }

    // =========================================================================
    // Program structure
    // =========================================================================

    fn parse_program(&mut self) -> QasmResult<Circuit> {
        self.expect(Token::OpenQasm)?;
        match self.advance() {
            Some(Token::FloatLiteral(v)) if (v - 2.0).abs() < 0.001 => {}
            Some(Token::IntLiteral(2)) => {}
            Some(other) => return Err(QasmError::InvalidVersion(other.to_string())),
            None => return Err(QasmError::UnexpectedEof("version number".into())),
        }
        self.expect(Token::Semicolon)?;

        let mut circuit = Circuit::new("main");
        while !self.is_eof() {
            self.parse_statement(&mut circuit)?;
        }
        Ok(circuit)
    }

    fn parse_statement(&mut self, circuit: &mut Circuit) -> QasmResult<()> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| QasmError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => {
                self.advance();
                match self.advance() {
                    Some(Token::StringLiteral(_)) => {}
                    Some(other) => {
                        return Err(QasmError::UnexpectedToken {
                            expected: "string literal".into(),
                            found: other.to_string(),
                        });
                    }
                    None => return Err(QasmError::UnexpectedEof("include path".into())),
                }
                self.expect(Token::Semicolon)
            }
            Token::Qreg => self.parse_qreg(circuit),
            Token::Creg => self.parse_creg(circuit),
            Token::Gate => self.parse_gate_decl(),
            Token::Opaque => self.parse_opaque_decl(),
            Token::If => self.parse_if(circuit),
            Token::Measure => self.parse_measure(circuit, None),
            Token::Reset => self.parse_reset(circuit, None),
            Token::Barrier => self.parse_barrier(circuit),
            Token::Identifier(name) => {
                self.advance();
                self.parse_gate_call(circuit, &name, None)
            }
            other => Err(QasmError::UnexpectedToken {
                expected: "statement".into(),
                found: other.to_string(),
            }),
        }
    }

    fn parse_qreg(&mut self, circuit: &mut Circuit) -> QasmResult<()> {
        self.expect(Token::Qreg)?;
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_int()? as u32;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        if self.qregs.contains_key(&name) {
            return Err(QasmError::DuplicateDeclaration(name));
        }
        let ids = circuit.add_qreg(&name, size);
        self.qregs.insert(
            name,
            RegInfo {
                start: ids.first().map_or(0, |q| q.0),
                size,
            },
        );
        Ok(())
    }

    fn parse_creg(&mut self, circuit: &mut Circuit) -> QasmResult<()> {
        self.expect(Token::Creg)?;
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_int()? as u32;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        if self.cregs.contains_key(&name) {
            return Err(QasmError::DuplicateDeclaration(name));
        }
        let ids = circuit.add_creg(&name, size);
        self.cregs.insert(
            name,
            RegInfo {
                start: ids.first().map_or(0, |c| c.0),
                size,
            },
        );
        Ok(())
    }

    // =========================================================================
    // Gate declarations
    // =========================================================================

    fn parse_gate_decl(&mut self) -> QasmResult<()> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;
        if self.gates.contains_key(&name) {
            return Err(QasmError::DuplicateDeclaration(name));
        }

        let params = if self.consume(&Token::LParen) {
            let mut names = vec![];
            if !self.check(&Token::RParen) {
                loop {
                    names.push(self.parse_identifier()?);
                    if !self.consume(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(Token::RParen)?;
            names
        } else {
            vec![]
        };

        let mut arg_names = vec![];
        loop {
            arg_names.push(self.parse_identifier()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }

        let positions: FxHashMap<String, u32> = arg_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();
        let symbols: FxHashSet<String> = params.iter().cloned().collect();

        self.expect(Token::LBrace)?;
        let mut factors = vec![];
        while !self.check(&Token::RBrace) {
            if self.consume(&Token::Barrier) {
                // Barriers inside a body are scheduling hints only.
                while !self.consume(&Token::Semicolon) {
                    if self.advance().is_none() {
                        return Err(QasmError::UnexpectedEof("barrier".into()));
                    }
                }
                continue;
            }
            factors.push(self.parse_body_call(&name, &positions, &symbols)?);
        }
        self.expect(Token::RBrace)?;

        let gate = CustomGate::new(&name, arg_names.len() as u32)
            .with_params(params.into_iter().map(ParameterExpression::symbol).collect())
            .with_factors(factors);
        self.gates.insert(name, gate);
        Ok(())
    }

    /// One gate-call line inside a declaration body, over local qubit
    /// names.
    fn parse_body_call(
        &mut self,
        outer: &str,
        positions: &FxHashMap<String, u32>,
        symbols: &FxHashSet<String>,
    ) -> QasmResult<GateFactor> {
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let p = self.parse_expr_list(symbols)?;
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let mut targets = vec![];
        loop {
            let arg = self.parse_identifier()?;
            let position = positions
                .get(&arg)
                .copied()
                .ok_or_else(|| QasmError::UndefinedIdentifier(format!("{outer}::{arg}")))?;
            targets.push(position);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon)?;

        if let Some(gate) = standard_gate(&name, &params)? {
            if gate.num_qubits() as usize != targets.len() {
                return Err(QasmError::WrongQubitCount {
                    gate: name,
                    expected: gate.num_qubits() as usize,
                    got: targets.len(),
                });
            }
            return Ok(GateFactor::standard(gate, targets));
        }

        let inner = self
            .gates
            .get(&name)
            .ok_or_else(|| QasmError::UnknownGate(name.clone()))?;
        if !params.is_empty() || !inner.params.is_empty() {
            return Err(QasmError::Unsupported(format!(
                "parameterized gate '{name}' inside the body of '{outer}'"
            )));
        }
        if inner.num_qubits as usize != targets.len() {
            return Err(QasmError::WrongQubitCount {
                gate: name,
                expected: inner.num_qubits as usize,
                got: targets.len(),
            });
        }
        Ok(GateFactor::custom(inner.clone(), targets))
    }

    fn parse_opaque_decl(&mut self) -> QasmResult<()> {
        // opaque name(params?) q0, q1; — declared but body-less. Calling
        // one produces a gate the compiler cannot lower, which is the
        // correct failure mode for an opaque gate with no matrix.
        self.expect(Token::Opaque)?;
        let name = self.parse_identifier()?;
        if self.consume(&Token::LParen) {
            while !self.consume(&Token::RParen) {
                if self.advance().is_none() {
                    return Err(QasmError::UnexpectedEof("opaque parameters".into()));
                }
            }
        }
        let mut arity = 0u32;
        loop {
            self.parse_identifier()?;
            arity += 1;
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon)?;

        if self.gates.contains_key(&name) {
            return Err(QasmError::DuplicateDeclaration(name));
        }
        self.gates.insert(name.clone(), CustomGate::new(name, arity));
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_if(&mut self, circuit: &mut Circuit) -> QasmResult<()> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let reg = self.parse_identifier()?;
        self.expect(Token::EqEq)?;
        let value = self.parse_int()?;
        self.expect(Token::RParen)?;

        let info = self
            .cregs
            .get(&reg)
            .ok_or_else(|| QasmError::UndefinedIdentifier(reg.clone()))?;
        let bits = (info.start..info.start + info.size).map(ClbitId);
        let condition = Condition::new(bits, Comparator::Eq, value);

        // QASM 2.0 allows any quantum op after the guard.
        match self.peek() {
            Some(Token::Measure) => self.parse_measure(circuit, Some(condition)),
            Some(Token::Reset) => self.parse_reset(circuit, Some(condition)),
            _ => {
                let name = self.parse_identifier()?;
                self.parse_gate_call(circuit, &name, Some(condition))
            }
        }
    }

    fn parse_measure(
        &mut self,
        circuit: &mut Circuit,
        condition: Option<Condition>,
    ) -> QasmResult<()> {
        self.expect(Token::Measure)?;
        let qubits = self.parse_qubit_operand()?;
        self.expect(Token::Arrow)?;
        let clbits = self.parse_clbit_operand()?;
        self.expect(Token::Semicolon)?;

        if qubits.len() != clbits.len() {
            return Err(QasmError::WrongQubitCount {
                gate: "measure".into(),
                expected: clbits.len(),
                got: qubits.len(),
            });
        }
        for (q, c) in qubits.into_iter().zip(clbits) {
            let mut instruction = Instruction::measure(q, c);
            if let Some(cond) = &condition {
                instruction = instruction.with_condition(cond.clone());
            }
            circuit.push(instruction);
        }
        Ok(())
    }

    fn parse_reset(
        &mut self,
        circuit: &mut Circuit,
        condition: Option<Condition>,
    ) -> QasmResult<()> {
        self.expect(Token::Reset)?;
        let qubits = self.parse_qubit_operand()?;
        self.expect(Token::Semicolon)?;
        for q in qubits {
            let mut instruction = Instruction::reset(q);
            if let Some(cond) = &condition {
                instruction = instruction.with_condition(cond.clone());
            }
            circuit.push(instruction);
        }
        Ok(())
    }

    fn parse_barrier(&mut self, circuit: &mut Circuit) -> QasmResult<()> {
        self.expect(Token::Barrier)?;
        let mut qubits = vec![];
        loop {
            qubits.extend(self.parse_qubit_operand()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon)?;
        circuit.push(Instruction::barrier(qubits));
        Ok(())
    }

    /// A gate call: `name(params?) arg, arg, …;` with register broadcast.
    fn parse_gate_call(
        &mut self,
        circuit: &mut Circuit,
        name: &str,
        condition: Option<Condition>,
    ) -> QasmResult<()> {
        let params = if self.consume(&Token::LParen) {
            let p = self.parse_expr_list(&FxHashSet::default())?;
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let mut args: Vec<Vec<QubitId>> = vec![];
        loop {
            args.push(self.parse_qubit_operand()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon)?;

        // Whole-register arguments broadcast the call; mixed arguments
        // must agree on the register length.
        let broadcast = args.iter().map(Vec::len).max().unwrap_or(1);
        for arg in &args {
            if arg.len() != 1 && arg.len() != broadcast {
                return Err(QasmError::WrongQubitCount {
                    gate: name.to_string(),
                    expected: broadcast,
                    got: arg.len(),
                });
            }
        }

        for i in 0..broadcast {
            let qubits: Vec<QubitId> = args
                .iter()
                .map(|arg| if arg.len() == 1 { arg[0] } else { arg[i] })
                .collect();

            let mut instruction = if let Some(gate) = standard_gate(name, &params)? {
                if gate.num_qubits() as usize != qubits.len() {
                    return Err(QasmError::WrongQubitCount {
                        gate: name.to_string(),
                        expected: gate.num_qubits() as usize,
                        got: qubits.len(),
                    });
                }
                Instruction::gate(gate, qubits)
            } else {
                let custom = self
                    .gates
                    .get(name)
                    .ok_or_else(|| QasmError::UnknownGate(name.to_string()))?;
                if custom.params.len() != params.len() {
                    return Err(QasmError::WrongParameterCount {
                        gate: name.to_string(),
                        expected: custom.params.len(),
                        got: params.len(),
                    });
                }
                if custom.num_qubits as usize != qubits.len() {
                    return Err(QasmError::WrongQubitCount {
                        gate: name.to_string(),
                        expected: custom.num_qubits as usize,
                        got: qubits.len(),
                    });
                }
                Instruction::gate(bind_custom(custom, &params)?, qubits)
            };

            if let Some(cond) = &condition {
                instruction = instruction.with_condition(cond.clone());
            }
            circuit.push(instruction);
        }
        Ok(())
    }

    // =========================================================================
    // Operands and expressions
    // =========================================================================

    /// A qubit operand: `name` (whole register) or `name[i]`.
    fn parse_qubit_operand(&mut self) -> QasmResult<Vec<QubitId>> {
        let name = self.parse_identifier()?;
        let (start, size) = {
            let info = self
                .qregs
                .get(&name)
                .ok_or_else(|| QasmError::UndefinedIdentifier(name.clone()))?;
            (info.start, info.size)
        };

        if self.consume(&Token::LBracket) {
            let index = self.parse_int()? as usize;
            self.expect(Token::RBracket)?;
            if index >= size as usize {
                return Err(QasmError::IndexOutOfBounds {
                    register: name,
                    index,
                    size: size as usize,
                });
            }
            Ok(vec![QubitId(start + index as u32)])
        } else {
            Ok((start..start + size).map(QubitId).collect())
        }
    }

    /// A classical operand: `name` (whole register) or `name[i]`.
    fn parse_clbit_operand(&mut self) -> QasmResult<Vec<ClbitId>> {
        let name = self.parse_identifier()?;
        let (start, size) = {
            let info = self
                .cregs
                .get(&name)
                .ok_or_else(|| QasmError::UndefinedIdentifier(name.clone()))?;
            (info.start, info.size)
        };

        if self.consume(&Token::LBracket) {
            let index = self.parse_int()? as usize;
            self.expect(Token::RBracket)?;
            if index >= size as usize {
                return Err(QasmError::IndexOutOfBounds {
                    register: name,
                    index,
                    size: size as usize,
                });
            }
            Ok(vec![ClbitId(start + index as u32)])
        } else {
            Ok((start..start + size).map(ClbitId).collect())
        }
    }

    fn parse_expr_list(
        &mut self,
        symbols: &FxHashSet<String>,
    ) -> QasmResult<Vec<ParameterExpression>> {
        let mut exprs = vec![];
        if self.check(&Token::RParen) {
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_expr(symbols)?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self, symbols: &FxHashSet<String>) -> QasmResult<ParameterExpression> {
        let mut lhs = self.parse_term(symbols)?;
        loop {
            if self.consume(&Token::Plus) {
                lhs = lhs + self.parse_term(symbols)?;
            } else if self.consume(&Token::Minus) {
                lhs = lhs - self.parse_term(symbols)?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_term(&mut self, symbols: &FxHashSet<String>) -> QasmResult<ParameterExpression> {
        let mut lhs = self.parse_unary(symbols)?;
        loop {
            if self.consume(&Token::Star) {
                lhs = lhs * self.parse_unary(symbols)?;
            } else if self.consume(&Token::Slash) {
                lhs = lhs / self.parse_unary(symbols)?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_unary(&mut self, symbols: &FxHashSet<String>) -> QasmResult<ParameterExpression> {
        if self.consume(&Token::Minus) {
            return Ok(-self.parse_unary(symbols)?);
        }
        self.parse_atom(symbols)
    }

    fn parse_atom(&mut self, symbols: &FxHashSet<String>) -> QasmResult<ParameterExpression> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(ParameterExpression::constant(v as f64)),
            Some(Token::FloatLiteral(v)) => Ok(ParameterExpression::constant(v)),
            Some(Token::Pi) => Ok(ParameterExpression::pi()),
            Some(Token::Identifier(name)) if symbols.contains(&name) => {
                Ok(ParameterExpression::symbol(name))
            }
            Some(Token::Identifier(name)) => Err(QasmError::UndefinedIdentifier(name)),
            Some(Token::LParen) => {
                let expr = self.parse_expr(symbols)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(other) => Err(QasmError::UnexpectedToken {
                expected: "expression".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof("expression".into())),
        }
    }
}

/// Resolve a standard-gate name, checking the parameter count. Returns
/// `Ok(None)` when the name is not a standard gate.
fn standard_gate(
    name: &str,
    params: &[ParameterExpression],
) -> QasmResult<Option<StandardGate>> {
    let expect_params = |n: usize| -> QasmResult<()> {
        if params.len() == n {
            Ok(())
        } else {
            Err(QasmError::WrongParameterCount {
                gate: name.to_string(),
                expected: n,
                got: params.len(),
            })
        }
    };
    let one = |f: fn(ParameterExpression) -> StandardGate| -> QasmResult<Option<StandardGate>> {
        expect_params(1)?;
        Ok(Some(f(params[0].clone())))
    };

    match name {
        "id" => expect_params(0).map(|()| Some(StandardGate::I)),
        "x" => expect_params(0).map(|()| Some(StandardGate::X)),
        "y" => expect_params(0).map(|()| Some(StandardGate::Y)),
        "z" => expect_params(0).map(|()| Some(StandardGate::Z)),
        "h" => expect_params(0).map(|()| Some(StandardGate::H)),
        "s" => expect_params(0).map(|()| Some(StandardGate::S)),
        "sdg" => expect_params(0).map(|()| Some(StandardGate::Sdg)),
        "t" => expect_params(0).map(|()| Some(StandardGate::T)),
        "tdg" => expect_params(0).map(|()| Some(StandardGate::Tdg)),
        "sx" => expect_params(0).map(|()| Some(StandardGate::SX)),
        "sxdg" => expect_params(0).map(|()| Some(StandardGate::SXdg)),
        "rx" => one(StandardGate::Rx),
        "ry" => one(StandardGate::Ry),
        "rz" => one(StandardGate::Rz),
        "p" | "u1" => one(StandardGate::P),
        "u" | "u3" => {
            expect_params(3)?;
            Ok(Some(StandardGate::U(
                params[0].clone(),
                params[1].clone(),
                params[2].clone(),
            )))
        }
        "cx" | "CX" => expect_params(0).map(|()| Some(StandardGate::CX)),
        "cy" => expect_params(0).map(|()| Some(StandardGate::CY)),
        "cz" => expect_params(0).map(|()| Some(StandardGate::CZ)),
        "ch" => expect_params(0).map(|()| Some(StandardGate::CH)),
        "swap" => expect_params(0).map(|()| Some(StandardGate::Swap)),
        "iswap" => expect_params(0).map(|()| Some(StandardGate::ISwap)),
        "crx" => one(StandardGate::CRx),
        "cry" => one(StandardGate::CRy),
        "crz" => one(StandardGate::CRz),
        "cp" | "cu1" => one(StandardGate::CP),
        "rxx" => one(StandardGate::RXX),
        "ryy" => one(StandardGate::RYY),
        "rzz" => one(StandardGate::RZZ),
        "ccx" => expect_params(0).map(|()| Some(StandardGate::CCX)),
        "cswap" => expect_params(0).map(|()| Some(StandardGate::CSwap)),
        _ => Ok(None),
    }
}

/// Bind a declared gate's symbolic parameters to call-site values.
fn bind_custom(custom: &CustomGate, values: &[ParameterExpression]) -> QasmResult<CustomGate> {
    if custom.params.is_empty() {
        return Ok(custom.clone());
    }

    let mut bindings = vec![];
    for (param, value) in custom.params.iter().zip(values) {
        let ParameterExpression::Symbol(name) = param else {
            return Err(QasmError::Unsupported(format!(
                "gate '{}' has a non-symbolic declared parameter",
                custom.name
            )));
        };
        let Some(value) = value.as_f64() else {
            return Err(QasmError::Unsupported(format!(
                "gate '{}' called with a symbolic parameter",
                custom.name
            )));
        };
        bindings.push((name.clone(), value));
    }

    let bind_expr = |expr: &ParameterExpression| {
        let mut bound = expr.clone();
        for (name, value) in &bindings {
            bound = bound.bind(name, *value);
        }
        bound.simplify()
    };

    let factors = custom
        .factors
        .iter()
        .map(|factor| {
            let gate = match &factor.gate {
                GateKind::Standard(gate) => GateKind::Standard(bind_standard(gate, &bind_expr)),
                GateKind::Custom(inner) => GateKind::Custom(inner.clone()),
            };
            GateFactor {
                gate,
                targets: factor.targets.clone(),
                param: factor.param.as_ref().map(&bind_expr),
            }
        })
        .collect();

    // The bound instance is a plain unparameterized gate; suffix the name
    // so differently-bound instances get distinct definitions. The suffix
    // must stay a valid identifier, so negative values use an 'm' marker.
    let suffix: String = bindings
        .iter()
        .map(|(_, v)| {
            let scaled = (v * 1e6).round() as i64;
            if scaled < 0 {
                format!("_m{}", -scaled)
            } else {
                format!("_{scaled}")
            }
        })
        .collect();
    Ok(CustomGate::new(format!("{}{suffix}", custom.name), custom.num_qubits)
        .with_factors(factors))
}

/// Rebuild a standard gate with every parameter passed through `bind`.
fn bind_standard(
    gate: &StandardGate,
    bind: &impl Fn(&ParameterExpression) -> ParameterExpression,
) -> StandardGate {
    match gate {
        StandardGate::Rx(p) => StandardGate::Rx(bind(p)),
        StandardGate::Ry(p) => StandardGate::Ry(bind(p)),
        StandardGate::Rz(p) => StandardGate::Rz(bind(p)),
        StandardGate::P(p) => StandardGate::P(bind(p)),
        StandardGate::U(t, p, l) => StandardGate::U(bind(t), bind(p), bind(l)),
        StandardGate::CRx(p) => StandardGate::CRx(bind(p)),
        StandardGate::CRy(p) => StandardGate::CRy(bind(p)),
        StandardGate::CRz(p) => StandardGate::CRz(bind(p)),
        StandardGate::CP(p) => StandardGate::CP(bind(p)),
        StandardGate::RXX(p) => StandardGate::RXX(bind(p)),
        StandardGate::RYY(p) => StandardGate::RYY(bind(p)),
        StandardGate::RZZ(p) => StandardGate::RZZ(bind(p)),
        other => other.clone(),
    }
}
