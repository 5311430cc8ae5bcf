use crate::{Comparison, Program, Sense, VarKind};
use std::io::Write;

/// Export a program to free `.mps` format.
///
/// MPS always minimizes, so a maximization is written as the minimization of
/// the negated objective. Binaries are wrapped in `INTORG`/`INTEND` markers
/// and given `BV` bounds; the quadratic part of the objective goes in a
/// `QUADOBJ` section, which holds `Q` for the term `½ xᵀQx`.
pub fn export_mps(program: &Program, buffer: &mut impl Write) -> Result<(), std::io::Error> {
    // https://www.ibm.com/docs/en/icos/22.1.2?topic=standard-records-in-mps-format
    let sign = match program.sense() {
        Sense::Maximize => -1.0,
        Sense::Minimize => 1.0,
    };
    let variables = program.variables();
    let constraints = program.constraints();

    writeln!(buffer, "NAME {}", program.name())?;
    writeln!(buffer, "ROWS")?;
    writeln!(buffer, " N    obj")?;
    for constraint in constraints {
        let kind = match constraint.cmp {
            Comparison::Le => "L",
            Comparison::Ge => "G",
            Comparison::Eq => "E",
        };
        writeln!(buffer, " {kind}    {}", constraint.name)?;
    }

    // Constraints are stored by row; MPS wants them by column.
    let mut columns = vec![Vec::new(); variables.len()];
    for constraint in constraints {
        for &(var, coef) in constraint.terms.iter() {
            columns[var.index()].push((constraint.name.as_str(), coef));
        }
    }
    let mut objective = vec![0.0; variables.len()];
    for &(var, coef) in program.objective().linear().terms() {
        objective[var.index()] += sign * coef;
    }

    writeln!(buffer, "COLUMNS")?;
    let mut marker = 0;
    let mut in_integers = false;
    for (j, var) in variables.iter().enumerate() {
        let binary = var.kind == VarKind::Binary;
        if binary != in_integers {
            let tag = if binary { "INTORG" } else { "INTEND" };
            writeln!(buffer, "    M{marker}    'MARKER'    '{tag}'")?;
            marker += 1;
            in_integers = binary;
        }
        // Every column has to be declared, even one that appears nowhere
        if objective[j] != 0.0 || columns[j].is_empty() {
            writeln!(buffer, "    {}    obj    {}", var.name, objective[j])?;
        }
        for (row, coef) in columns[j].iter() {
            writeln!(buffer, "    {}    {row}    {coef}", var.name)?;
        }
    }
    if in_integers {
        writeln!(buffer, "    M{marker}    'MARKER'    'INTEND'")?;
    }

    writeln!(buffer, "RHS")?;
    let offset = program.objective().linear().offset();
    if offset != 0.0 {
        // The objective's RHS is the negated constant
        writeln!(buffer, "    RHS    obj    {}", -sign * offset)?;
    }
    for constraint in constraints.iter().filter(|constraint| constraint.rhs != 0.0) {
        writeln!(buffer, "    RHS    {}    {}", constraint.name, constraint.rhs)?;
    }

    writeln!(buffer, "BOUNDS")?;
    for var in variables {
        let name = &var.name;
        if var.kind == VarKind::Binary {
            writeln!(buffer, " BV BND    {name}")?;
            continue;
        }
        match (var.lower.is_finite(), var.upper.is_finite()) {
            (false, false) => writeln!(buffer, " FR BND    {name}")?,
            (lower, upper) => {
                if !lower {
                    writeln!(buffer, " MI BND    {name}")?;
                } else if var.lower != 0.0 {
                    writeln!(buffer, " LO BND    {name}    {}", var.lower)?;
                }
                if upper {
                    writeln!(buffer, " UP BND    {name}    {}", var.upper)?;
                }
            }
        }
    }

    let products = program.objective().products();
    if !products.is_empty() {
        writeln!(buffer, "QUADOBJ")?;
        for &(x, y, coef) in products {
            // c·x·y is ½(Q_xy + Q_yx)·x·y, c·x² is ½·Q_xx·x²
            let term = if x == y { 2.0 * coef } else { coef };
            writeln!(
                buffer,
                "    {}    {}    {}",
                variables[x.index()].name,
                variables[y.index()].name,
                sign * term
            )?;
        }
    }

    writeln!(buffer, "ENDATA")?;
    Ok(())
}

/// Export a program to CPLEX `.lp` format.
///
/// Unlike MPS, LP keeps the sense of the objective. Square brackets delimit
/// quadratic terms in LP, so they are replaced by parentheses in names.
pub fn export_lp(program: &Program, buffer: &mut impl Write) -> Result<(), std::io::Error> {
    let variables = program
        .variables()
        .iter()
        .map(|var| var.name.replace('[', "(").replace(']', ")"))
        .collect::<Vec<_>>();

    writeln!(buffer, "\\ {}", program.name())?;
    writeln!(
        buffer,
        "{}",
        match program.sense() {
            Sense::Maximize => "Maximize",
            Sense::Minimize => "Minimize",
        }
    )?;

    let objective = program.objective();
    write!(buffer, " obj:")?;
    for &(var, coef) in objective.linear().terms() {
        write!(buffer, " {} {}", signed(coef), variables[var.index()])?;
    }
    if !objective.products().is_empty() {
        write!(buffer, " + [")?;
        for &(x, y, coef) in objective.products() {
            // the bracket is halved, so every coefficient is doubled
            if x == y {
                write!(buffer, " {} {} ^ 2", signed(2.0 * coef), variables[x.index()])?;
            } else {
                write!(
                    buffer,
                    " {} {} * {}",
                    signed(2.0 * coef),
                    variables[x.index()],
                    variables[y.index()]
                )?;
            }
        }
        write!(buffer, " ] / 2")?;
    }
    let offset = objective.linear().offset();
    if offset != 0.0 || (objective.linear().terms().is_empty() && objective.products().is_empty()) {
        write!(buffer, " {}", signed(offset))?;
    }
    writeln!(buffer)?;

    writeln!(buffer, "Subject To")?;
    for constraint in program.constraints() {
        let name = constraint.name.replace('[', "(").replace(']', ")");
        write!(buffer, " {name}:")?;
        if constraint.terms.is_empty() {
            // LP needs at least one variable on the left
            write!(buffer, " 0 {}", variables.first().map(String::as_str).unwrap_or("x"))?;
        }
        for &(var, coef) in constraint.terms.iter() {
            write!(buffer, " {} {}", signed(coef), variables[var.index()])?;
        }
        writeln!(buffer, " {} {}", constraint.cmp, constraint.rhs)?;
    }

    writeln!(buffer, "Bounds")?;
    for (var, name) in program.variables().iter().zip(variables.iter()) {
        if var.kind == VarKind::Binary {
            continue;
        }
        match (var.lower.is_finite(), var.upper.is_finite()) {
            (false, false) => writeln!(buffer, " {name} free")?,
            (true, true) => writeln!(buffer, " {} <= {name} <= {}", var.lower, var.upper)?,
            (true, false) => {
                if var.lower != 0.0 {
                    writeln!(buffer, " {name} >= {}", var.lower)?;
                }
            }
            (false, true) => writeln!(buffer, " -inf <= {name} <= {}", var.upper)?,
        }
    }

    let binaries = program
        .variables()
        .iter()
        .zip(variables.iter())
        .filter(|(var, _)| var.kind == VarKind::Binary)
        .map(|(_, name)| name.as_str())
        .collect::<Vec<_>>();
    if !binaries.is_empty() {
        writeln!(buffer, "Binaries")?;
        for name in binaries {
            writeln!(buffer, " {name}")?;
        }
    }

    writeln!(buffer, "End")?;
    Ok(())
}

/// `+ 3` or `- 3`, the way LP wants each term introduced
fn signed(value: f64) -> String {
    if value < 0.0 {
        format!("- {}", -value)
    } else {
        format!("+ {value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LinearExpr, QuadExpr};

    fn program() -> Program {
        let mut program = Program::new("tiny");
        let p = program.continuous("price[A]", 0.0, f64::INFINITY);
        let q = program.continuous("qty[A,S]", 0.0, f64::INFINITY);
        let x = program.binary("choice[A,S]");
        program.constrain("qty_zero[A,S]", q, Comparison::Le, LinearExpr::new().term(x, 50.0));
        program.constrain(
            "single_choice[S]",
            x,
            Comparison::Eq,
            LinearExpr::constant(1.0),
        );
        let mut profit = QuadExpr::new();
        profit.add_product(p, q, 1.0);
        profit.add_term(q, -2.0);
        program.set_objective(Sense::Maximize, profit);
        program
    }

    #[test]
    fn test_mps() {
        let mut buffer = Vec::new();
        export_mps(&program(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let expected = "\
NAME tiny
ROWS
 N    obj
 L    qty_zero[A,S]
 E    single_choice[S]
COLUMNS
    price[A]    obj    0
    qty[A,S]    obj    2
    qty[A,S]    qty_zero[A,S]    1
    M0    'MARKER'    'INTORG'
    choice[A,S]    qty_zero[A,S]    -50
    choice[A,S]    single_choice[S]    1
    M1    'MARKER'    'INTEND'
RHS
    RHS    single_choice[S]    1
BOUNDS
 BV BND    choice[A,S]
QUADOBJ
    price[A]    qty[A,S]    -1
ENDATA
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_lp() {
        let mut buffer = Vec::new();
        export_lp(&program(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let expected = "\
\\ tiny
Maximize
 obj: - 2 qty(A,S) + [ + 2 price(A) * qty(A,S) ] / 2
Subject To
 qty_zero(A,S): + 1 qty(A,S) - 50 choice(A,S) <= 0
 single_choice(S): + 1 choice(A,S) = 1
Bounds
Binaries
 choice(A,S)
End
";
        assert_eq!(text, expected);
    }
}
