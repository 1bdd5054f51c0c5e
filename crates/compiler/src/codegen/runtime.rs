//! The emitted preamble: opaque runtime types, the `matte_*` ABI
//! declarations, and the exception-check macros expanded at every
//! fallible call site.
//!
//! `MATTE_HANDLE` propagates: it copies the exception into the caller's
//! zone with a fresh call-stack frame, tears down the local zone, and
//! returns. `MATTE_CATCH` instead binds the exception to the active
//! catch variable and branches to the catch label.

pub const PREAMBLE: &str = r#"/* generated by mattec */

#include <stddef.h>

typedef struct MatteZone MatteZone;
typedef struct MatteObject MatteObject;

extern MatteZone *matte_zone_create(unsigned long n);
extern void matte_zone_destroy(MatteZone *z);

extern MatteObject *matte_int_new(MatteZone *z, long v);
extern MatteObject *matte_float_new(MatteZone *z, double v);
extern MatteObject *matte_complex_new(MatteZone *z, double re, double im);
extern MatteObject *matte_string_new(MatteZone *z, const char *s);

extern MatteObject *matte_object_copy(MatteZone *z, MatteObject *obj);
extern void matte_object_free(MatteZone *z, MatteObject *obj);
extern int matte_object_disp(MatteZone *z, MatteObject *obj);
extern int matte_object_display(MatteZone *z, MatteObject *obj, const char *name);
extern int matte_object_true(MatteObject *obj);
extern int matte_is_exception(MatteObject *obj);

extern int matte_exceptions_check(void);
extern MatteObject *matte_exceptions_get(MatteZone *z);
extern MatteObject *matte_except_propagate(MatteZone *z, MatteObject *obj,
                                           const char *file, const char *func,
                                           long line);
extern int matte_report_result(MatteObject *result);

extern MatteObject *matte_object_plus(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_minus(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_uminus(MatteZone *z, MatteObject *a);
extern MatteObject *matte_object_times(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_mtimes(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_rdivide(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_ldivide(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_mrdivide(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_mldivide(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_power(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_mpower(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_lt(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_gt(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_le(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_ge(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_ne(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_eq(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_and(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_or(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_mand(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_mor(MatteZone *z, MatteObject *a, MatteObject *b);
extern MatteObject *matte_object_not(MatteZone *z, MatteObject *a);
extern MatteObject *matte_object_colon(MatteZone *z, MatteObject *a, MatteObject *b,
                                       MatteObject *c);
extern MatteObject *matte_object_ctranspose(MatteZone *z, MatteObject *a);
extern MatteObject *matte_object_transpose(MatteZone *z, MatteObject *a);
extern MatteObject *matte_object_horzcat(MatteZone *z, int n, MatteObject **items);
extern MatteObject *matte_object_vertcat(MatteZone *z, int n, MatteObject **items);

extern MatteObject *matte_list_argin(MatteZone *z, int n, MatteObject **items);
extern MatteObject *matte_list_argout(MatteZone *z, int n, MatteObject **items);
extern MatteObject *matte_list_get(MatteObject *lst, int index);

extern MatteObject *matte_iter_new(MatteZone *z, MatteObject *obj);
extern int matte_iter_next(MatteZone *z, MatteObject *it);
extern MatteObject *matte_iter_value(MatteObject *it);

extern MatteObject *matte_disp(MatteZone *z, MatteObject *argin);
extern MatteObject *matte_sum(MatteZone *z, MatteObject *argin);

#define MATTE_HANDLE(var, fi, fn, ln) \
  if (matte_is_exception((MatteObject *)(var))) { \
    MatteObject *_e = matte_except_propagate(_z0, (MatteObject *)(var), fi, fn, ln); \
    matte_zone_destroy(_z1); \
    return _e; \
  }

#define MATTE_CATCH(var, cvar, lbl, fi, fn, ln) \
  if (matte_is_exception((MatteObject *)(var))) { \
    cvar = (MatteObject *)(var); \
    goto lbl; \
  }

"#;

/// The application entry point, appended for the source and executable
/// output modes; the in-memory mode loads `matte_main` directly.
pub const ENTRY_POINT: &str = r#"int main (int argc, char **argv) {
  MatteObject *_ao = matte_main(NULL, NULL);
  return matte_report_result(_ao);
}
"#;
