use crate::context::Context;

/// `cairn list`: every configured stack, one local name per line.
pub fn run(ctx: &Context) {
    for name in ctx.config().stack_names() {
        println!("{}", name);
    }
}
