#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]

use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use dstruct::compiler::DsCompiler;
use dstruct::error::DsError;
use dstruct::numbers::{FloatNumber, MultiPrecFloat, F64, PRECISION};
use dstruct::structure::DerivativeStructure;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
    /// Disable timing of the execution
    #[arg(long, global = true)]
    no_timing: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical layout of the coefficient arrays
    Layout {
        /// Number of free parameters
        parameters: usize,
        /// Truncation order
        order: usize,
    },
    /// Print the product rule for every coefficient
    Multiplication { parameters: usize, order: usize },
    /// Print the univariate chain rule for every coefficient
    Composition { parameters: usize, order: usize },
    /// Print the chain rule from outer to base parameters for every coefficient
    Rebase {
        /// Number of parameters of the outer function
        outer_parameters: usize,
        /// Number of parameters the inner functions depend on
        base_parameters: usize,
        order: usize,
    },
    /// Print the value and derivatives of an elementary function at a point
    Eval {
        function: Function,
        /// Truncation order
        #[arg(short, long, default_value_t = 4)]
        order: usize,
        /// The point at which the function is expanded
        #[arg(long, allow_hyphen_values = true)]
        at: f64,
        /// Use floating point numbers with the given number of bits of precision
        ///
        /// Arbitrary precision floating point numbers are provided by the MPFR library.
        #[arg(short, long)]
        precision: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Function {
    Exp,
    Expm1,
    Ln,
    Ln1p,
    Log10,
    Sqrt,
    Cbrt,
    Reciprocal,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
}

pub fn main() {
    let args = CliArgs::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), DsError> {
    let start = Instant::now();
    match args.command {
        Command::Layout { parameters, order } => {
            let compiler = DsCompiler::get(parameters, order);
            println!(
                "Layout for {parameters} parameters, order {order} ({} coefficients):",
                compiler.size()
            );
            for k in 0..compiler.size() {
                println!(
                    "{k} {} {}",
                    compiler.format_multi_index(k),
                    compiler.orders_sum(k)
                );
            }
        }
        Command::Multiplication { parameters, order } => {
            let compiler = DsCompiler::get(parameters, order);
            println!("Multiplication rules for {parameters} parameters, order {order}:");
            for k in 0..compiler.size() {
                println!(
                    "{}: {}",
                    compiler.format_multi_index(k),
                    compiler.multiplication_rule(k)
                );
            }
        }
        Command::Composition { parameters, order } => {
            let compiler = DsCompiler::get(parameters, order);
            println!("Composition rules for {parameters} parameters, order {order}:");
            for k in 0..compiler.size() {
                println!(
                    "{}: {}",
                    compiler.format_multi_index(k),
                    compiler.composition_rule(k)
                );
            }
        }
        Command::Rebase {
            outer_parameters,
            base_parameters,
            order,
        } => {
            let outer = DsCompiler::get(outer_parameters, order);
            let base = DsCompiler::get(base_parameters, order);
            let table = outer.rebaser(&base)?;
            println!(
                "Rebase rules from {outer_parameters} to {base_parameters} parameters, order {order}:"
            );
            for k in 0..table.len() {
                println!(
                    "{}: {}",
                    base.format_multi_index(k),
                    outer.rebase_rule(&base, &table, k)
                );
            }
        }
        Command::Eval {
            function,
            order,
            at,
            precision,
        } => {
            if let Some(bits) = precision {
                PRECISION.with(|p| {
                    let _ = p.set(bits);
                });
                print_expansion(&eval::<MultiPrecFloat>(function, order, at)?);
            } else {
                print_expansion(&eval::<F64>(function, order, at)?);
            }
        }
    }
    print_elapsed_message(start, "Total time: ", args);
    Ok(())
}

fn eval<T: FloatNumber>(
    function: Function,
    order: usize,
    at: f64,
) -> Result<DerivativeStructure<T>, DsError> {
    let x = DerivativeStructure::variable(1, order, 0, T::from(at))?;
    Ok(match function {
        Function::Exp => x.exp(),
        Function::Expm1 => x.exp_m1(),
        Function::Ln => x.ln(),
        Function::Ln1p => x.ln_1p(),
        Function::Log10 => x.log10(),
        Function::Sqrt => x.sqrt(),
        Function::Cbrt => x.cbrt(),
        Function::Reciprocal => x.reciprocal(),
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Asin => x.asin(),
        Function::Acos => x.acos(),
        Function::Atan => x.atan(),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Asinh => x.asinh(),
        Function::Acosh => x.acosh(),
        Function::Atanh => x.atanh(),
    })
}

fn print_expansion<T: FloatNumber>(f: &DerivativeStructure<T>) {
    for (k, x) in f.all_derivatives().iter().enumerate() {
        println!("f^({k}) = {x}");
    }
}

fn print_elapsed_message(start: Instant, text: &str, args: &CliArgs) {
    if !args.no_timing {
        let elapsed = start.elapsed().as_secs_f64();
        print!("{text}");
        if elapsed < 0.001 {
            println!("{elapsed:.6}s");
        } else if elapsed < 0.01 {
            println!("{elapsed:.5}s");
        } else if elapsed < 0.1 {
            println!("{elapsed:.4}s");
        } else {
            println!("{elapsed:.3}s");
        }
    }
}
