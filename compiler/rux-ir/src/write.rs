//! Textual emission of the module in LLVM assembly form (opaque
//! pointers, LLVM 15+): named struct types first, then globals, then
//! function declarations and definitions in insertion order.
use std::fmt;

use itertools::Itertools;

use crate::{
    ir::{ConstKind, FuncId, Inst, IrCtx, Module, ValueId, ValueKind},
    ty::{IrTy, TyId},
};

/// Borrow of everything needed to print a module.
pub struct ModuleWriter<'ctx> {
    pub module: &'ctx Module,
    pub ctx: &'ctx IrCtx,
}

impl<'ctx> ModuleWriter<'ctx> {
    pub fn new(module: &'ctx Module, ctx: &'ctx IrCtx) -> Self {
        Self { module, ctx }
    }

    fn ty_name(&self, id: TyId) -> String {
        match self.ctx.tys.get(id) {
            IrTy::Void => "void".to_string(),
            IrTy::I1 => "i1".to_string(),
            IrTy::I8 => "i8".to_string(),
            IrTy::I32 => "i32".to_string(),
            IrTy::Ptr => "ptr".to_string(),
            IrTy::Array { element, length } => {
                format!("[{} x {}]", length, self.ty_name(*element))
            }
            IrTy::Struct(id) => format!("%struct.{}", self.ctx.tys.struct_data(*id).name),
            IrTy::Fn { .. } => "ptr".to_string(),
        }
    }

    /// How a value is referred to as an operand.
    fn value_name(&self, id: ValueId) -> String {
        let data = self.ctx.value(id);
        match &data.kind {
            ValueKind::Constant(kind) => self.const_name(data.ty, kind),
            ValueKind::Global { .. } => format!("@{}", data.name.as_deref().unwrap_or("?")),
            _ => format!("%{}", data.name.as_deref().unwrap_or("?")),
        }
    }

    fn const_name(&self, ty: TyId, kind: &ConstKind) -> String {
        match kind {
            // i1/i8/i32 constants all print numerically; i32 prints
            // signed so `-1` round-trips.
            ConstKind::Int(value) => match self.ctx.tys.get(ty) {
                IrTy::I32 => format!("{}", *value as u32 as i32),
                _ => format!("{value}"),
            },
            ConstKind::Null => "null".to_string(),
            ConstKind::Struct(fields) => {
                let fields = fields.iter().map(|field| self.typed_value(*field)).join(", ");
                format!("{{ {fields} }}")
            }
            ConstKind::Array(elements) => {
                let elements =
                    elements.iter().map(|element| self.typed_value(*element)).join(", ");
                format!("[{elements}]")
            }
        }
    }

    fn typed_value(&self, id: ValueId) -> String {
        format!("{} {}", self.ty_name(self.ctx.value_ty(id)), self.value_name(id))
    }

    fn write_inst(&self, f: &mut fmt::Formatter<'_>, id: ValueId) -> fmt::Result {
        let data = self.ctx.value(id);
        let ValueKind::Inst(inst) = &data.kind else {
            unreachable!("blocks hold instructions");
        };

        write!(f, "  ")?;
        if let Some(name) = &data.name {
            write!(f, "%{name} = ")?;
        }

        match inst {
            Inst::Binary { op, lhs, rhs } => {
                write!(
                    f,
                    "{} {} {}, {}",
                    op.mnemonic(),
                    self.ty_name(self.ctx.value_ty(*lhs)),
                    self.value_name(*lhs),
                    self.value_name(*rhs)
                )
            }
            Inst::ICmp { cond, lhs, rhs } => {
                write!(
                    f,
                    "icmp {} {} {}, {}",
                    cond.mnemonic(),
                    self.ty_name(self.ctx.value_ty(*lhs)),
                    self.value_name(*lhs),
                    self.value_name(*rhs)
                )
            }
            Inst::Alloca { allocated } => write!(f, "alloca {}", self.ty_name(*allocated)),
            Inst::Load { ptr } => {
                write!(f, "load {}, ptr {}", self.ty_name(data.ty), self.value_name(*ptr))
            }
            Inst::Store { value, ptr } => {
                write!(f, "store {}, ptr {}", self.typed_value(*value), self.value_name(*ptr))
            }
            Inst::Br { target } => {
                write!(f, "br label %{}", self.ctx.block(*target).label)
            }
            Inst::CondBr { cond, then_target, else_target } => {
                write!(
                    f,
                    "br i1 {}, label %{}, label %{}",
                    self.value_name(*cond),
                    self.ctx.block(*then_target).label,
                    self.ctx.block(*else_target).label
                )
            }
            Inst::Ret { value: Some(value) } => write!(f, "ret {}", self.typed_value(*value)),
            Inst::Ret { value: None } => write!(f, "ret void"),
            Inst::Phi { incomings } => {
                write!(f, "phi {} ", self.ty_name(data.ty))?;
                for (index, (value, block)) in incomings.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(
                        f,
                        "[ {}, %{} ]",
                        self.value_name(*value),
                        self.ctx.block(*block).label
                    )?;
                }
                Ok(())
            }
            Inst::Call { callee, args } => {
                let ret = self.ctx.fn_ret_ty(*callee);
                write!(
                    f,
                    "call {} @{}(",
                    self.ty_name(ret),
                    self.ctx.function(*callee).name
                )?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.typed_value(*arg))?;
                }
                write!(f, ")")
            }
            Inst::Gep { base_ty, ptr, indices } => {
                write!(
                    f,
                    "getelementptr {}, ptr {}",
                    self.ty_name(*base_ty),
                    self.value_name(*ptr)
                )?;
                for index in indices {
                    write!(f, ", {}", self.typed_value(*index))?;
                }
                Ok(())
            }
            Inst::PtrToInt { ptr } => {
                write!(f, "ptrtoint ptr {} to {}", self.value_name(*ptr), self.ty_name(data.ty))
            }
            Inst::Zext { value } => {
                write!(f, "zext {} to {}", self.typed_value(*value), self.ty_name(data.ty))
            }
        }
    }

    fn write_function(&self, f: &mut fmt::Formatter<'_>, id: FuncId) -> fmt::Result {
        let function = self.ctx.function(id);
        let ret = self.ctx.fn_ret_ty(id);

        if function.is_declaration {
            write!(f, "declare {} @{}(", self.ty_name(ret), function.name)?;
            for (index, param) in self.ctx.fn_param_tys(id).iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.ty_name(*param))?;
            }
            return writeln!(f, ")");
        }

        write!(f, "define {} @{}(", self.ty_name(ret), function.name)?;
        for (index, arg) in function.args.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.typed_value(*arg))?;
        }
        writeln!(f, ") {{")?;

        for (index, block) in function.blocks.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", self.ctx.block(*block).label)?;
            for inst in &self.ctx.block(*block).insts {
                self.write_inst(f, *inst)?;
                writeln!(f)?;
            }
        }

        writeln!(f, "}}")
    }
}

impl fmt::Display for ModuleWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separate = false;

        for (_, data) in self.ctx.tys.structs() {
            let fields = data.fields.iter().map(|ty| self.ty_name(*ty)).join(", ");
            writeln!(f, "%struct.{} = type {{ {fields} }}", data.name)?;
            separate = true;
        }

        if separate && !self.module.globals.is_empty() {
            writeln!(f)?;
        }
        for global in self.module.globals.values() {
            let data = self.ctx.value(*global);
            let ValueKind::Global { is_const, init } = &data.kind else {
                unreachable!("module globals are global values");
            };

            let keyword = if *is_const { "constant" } else { "global" };
            match init {
                Some(init) => writeln!(
                    f,
                    "@{} = {keyword} {}",
                    data.name.as_deref().unwrap_or("?"),
                    self.typed_value(*init)
                )?,
                None => writeln!(
                    f,
                    "@{} = {keyword} {} zeroinitializer",
                    data.name.as_deref().unwrap_or("?"),
                    self.ty_name(data.ty)
                )?,
            }
            separate = true;
        }

        for func in self.module.functions.values() {
            if separate {
                writeln!(f)?;
            }
            self.write_function(f, *func)?;
            separate = true;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::ir::{BinOp, ICmpCond};

    #[test]
    fn prints_a_small_function() {
        let mut ctx = IrCtx::new();
        let mut module = Module::new("main");

        let i32_ty = ctx.tys.i32;
        let fn_ty = ctx.tys.fn_ty(vec![], i32_ty);
        let func = ctx.new_function("main", fn_ty, &[], false).unwrap();
        module.functions.insert("main".into(), func);
        let entry = ctx.new_block(func, "entry");

        let one = ctx.const_int(i32_ty, 1).unwrap();
        let two = ctx.const_int(i32_ty, 2).unwrap();

        let mut builder = Builder::new(&mut ctx);
        builder.set_insert_point(entry);
        let sum = builder.create_binary(BinOp::Add, one, two).unwrap();
        let _flag = builder.create_icmp(ICmpCond::Ult, sum, two).unwrap();
        builder.create_ret(Some(sum)).unwrap();

        let text = ModuleWriter::new(&module, &ctx).to_string();
        assert_eq!(
            text,
            "define i32 @main() {\n\
             entry:\n\
             \x20 %tmp.0 = add i32 1, 2\n\
             \x20 %tmp.1 = icmp ult i32 %tmp.0, 2\n\
             \x20 ret i32 %tmp.0\n\
             }\n"
        );
    }

    #[test]
    fn prints_structs_and_globals() {
        let mut ctx = IrCtx::new();
        let mut module = Module::new("main");

        let struct_ty = ctx.tys.struct_ty("P");
        let IrTy::Struct(id) = *ctx.tys.get(struct_ty) else { unreachable!() };
        let i32_ty = ctx.tys.i32;
        ctx.tys.set_struct_fields(id, vec![i32_ty, i32_ty]);

        let five = ctx.const_int(i32_ty, 5).unwrap();
        let global = ctx.new_global("LIMIT", i32_ty, Some(five), true);
        module.globals.insert("LIMIT".into(), global);

        let text = ModuleWriter::new(&module, &ctx).to_string();
        assert_eq!(
            text,
            "%struct.P = type { i32, i32 }\n\n@LIMIT = constant i32 5\n"
        );
    }

    #[test]
    fn negative_constants_print_signed() {
        let mut ctx = IrCtx::new();
        let module = Module::new("main");

        let i32_ty = ctx.tys.i32;
        let minus_one = ctx.const_int(i32_ty, u32::MAX as u64).unwrap();

        let writer = ModuleWriter::new(&module, &ctx);
        assert_eq!(writer.value_name(minus_one), "-1");
    }
}
