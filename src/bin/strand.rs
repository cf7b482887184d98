//! Strand CLI
//!
//! Runs JSON-encoded programs against the suspendable interpreter core, plus a
//! couple of built-in demos that drive generator and async-generator instances
//! from the host side.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use strand_core::interpreter::ast::{BinOp, Expr, FuncDef, FuncKind, Stmt};
use strand_core::interpreter::{async_gen, dispatch, generator};
use strand_core::interpreter::{run_program_in, Completion, Scope, Val};
use strand_core::promise::{self, PromiseState};
use strand_core::realm::Realm;
use strand_core::StrandError;

#[derive(Parser)]
#[command(name = "strand")]
#[command(about = "Strand - a suspendable interpreter core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON-encoded program (an array of statement nodes)
    Run {
        /// Path to the program file
        file: String,
    },

    /// Drive a demo generator to completion from the host
    Gen {
        /// How many squares to produce
        #[arg(long, default_value = "5")]
        limit: u32,
    },

    /// Queue requests against a demo async generator and drain the realm
    AsyncGen,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file } => run_file(&file),
        Commands::Gen { limit } => gen_demo(limit),
        Commands::AsyncGen => async_gen_demo(),
    }
}

fn run_file(path: &str) -> Result<()> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let program: Vec<Stmt> =
        serde_json::from_str(&source).with_context(|| format!("parsing {path}"))?;

    let realm = Realm::new();
    let globals = Scope::root();
    globals.declare(
        "print",
        Val::Native(strand_core::interpreter::value::NativeFn::new(
            "print",
            |_realm, args| {
                let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
                println!("{}", line.join(" "));
                Ok(Val::Undefined)
            },
        )),
    );

    let value = run_program_in(&realm, &globals, &program)?;
    println!("=> {value}");
    Ok(())
}

/// `function* squares(limit) { for (let i = 0; i < limit; i = i + 1) yield i * i; }`
fn squares_def(limit: u32) -> Vec<Stmt> {
    let ident = |name: &str| {
        Box::new(Expr::Ident {
            name: name.to_string(),
        })
    };
    let num = |v: f64| Box::new(Expr::LitNum { v });
    vec![Stmt::Return {
        value: Some(Expr::Call {
            callee: Box::new(Expr::Func {
                def: FuncDef {
                    name: Some("squares".into()),
                    params: vec!["limit".into()],
                    body: vec![Stmt::For {
                        label: None,
                        decls: vec![("i".into(), Expr::LitNum { v: 0.0 })],
                        test: Some(Expr::Binary {
                            op: BinOp::Lt,
                            left: ident("i"),
                            right: ident("limit"),
                        }),
                        update: vec![(
                            "i".into(),
                            Expr::Binary {
                                op: BinOp::Add,
                                left: ident("i"),
                                right: num(1.0),
                            },
                        )],
                        body: Box::new(Stmt::Expr {
                            expr: Expr::Yield {
                                inner: Some(Box::new(Expr::Binary {
                                    op: BinOp::Mul,
                                    left: ident("i"),
                                    right: ident("i"),
                                })),
                            },
                        }),
                    }],
                    kind: FuncKind::Generator,
                },
            }),
            args: vec![Expr::LitNum { v: limit as f64 }],
        }),
    }]
}

fn gen_demo(limit: u32) -> Result<()> {
    let realm = Realm::new();
    let globals = Scope::root();
    let instance = run_program_in(&realm, &globals, &squares_def(limit))?;
    let Val::Generator(gen) = instance else {
        bail!("demo program did not return a generator");
    };

    loop {
        let r = generator::resume(&realm, &gen, Completion::Normal(Val::Undefined))
            .map_err(|s| StrandError::UnhandledException(format!("{s:?}")))?;
        if r.done {
            break;
        }
        println!("yielded {}", r.value);
    }
    Ok(())
}

/// `async function* pair() { yield "a"; yield "b"; }`, driven by three queued
/// `next` requests that all go in before any result settles.
fn async_gen_demo() -> Result<()> {
    let realm = Realm::new();
    let def = FuncDef {
        name: Some("pair".into()),
        params: vec![],
        body: vec![
            Stmt::Expr {
                expr: Expr::Yield {
                    inner: Some(Box::new(Expr::LitStr { v: "a".into() })),
                },
            },
            Stmt::Expr {
                expr: Expr::Yield {
                    inner: Some(Box::new(Expr::LitStr { v: "b".into() })),
                },
            },
        ],
        kind: FuncKind::AsyncGenerator,
    };
    let globals = Scope::root();
    let closure = Val::Closure(std::rc::Rc::new(strand_core::interpreter::value::ClosureData {
        def: std::rc::Rc::new(def),
        env: globals,
    }));
    let instance = dispatch::call(&realm, &closure, vec![])
        .map_err(|s| StrandError::UnhandledException(format!("{s:?}")))?;
    let Val::AsyncGenerator(agen) = instance else {
        bail!("instantiation did not produce an async generator");
    };

    let requests: Vec<_> = (0..3)
        .map(|_| async_gen::enqueue(&realm, &agen, Completion::Normal(Val::Undefined)))
        .collect();
    realm.run_jobs();

    for (i, p) in requests.iter().enumerate() {
        match promise::state(p) {
            PromiseState::Fulfilled(v) => println!("request {i}: {v}"),
            PromiseState::Rejected(e) => println!("request {i}: rejected with {e}"),
            PromiseState::Pending => println!("request {i}: still pending"),
        }
    }
    Ok(())
}
